///! Element set extraction from heterogeneous upstream payloads
use super::types::ElementSet;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Conventional field names that may hold the satellite array, in
/// preference order. Older upstream revisions returned a bare array.
const LIST_FIELDS: &[&str] = &["sats", "satellites", "data", "results", "items"];

/// Catalog number is the 5-digit field after the leading line-number
/// digit of TLE line 1.
static CATALOG_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^1\s+(\d{5})").unwrap());

/// Where the record array was found in the upstream payload. Resolved once
/// here; the rest of the system never sniffs payload shapes.
enum RecordList<'a> {
    TopLevel(&'a [Value]),
    Field(&'static str, &'a [Value]),
    Missing,
}

fn resolve_record_list(payload: &Value) -> RecordList<'_> {
    if let Value::Array(records) = payload {
        return RecordList::TopLevel(records);
    }
    if let Value::Object(map) = payload {
        for &field in LIST_FIELDS {
            if let Some(Value::Array(records)) = map.get(field) {
                return RecordList::Field(field, records);
            }
        }
    }
    RecordList::Missing
}

/// Normalize an upstream payload into a uniform element set list
///
/// Records missing either TLE line or with an unparsable catalog id are
/// silently dropped; one bad record never affects its neighbors. An
/// unrecognized payload shape yields an empty list, not an error.
pub fn extract_element_sets(payload: &Value) -> Vec<ElementSet> {
    let records = match resolve_record_list(payload) {
        RecordList::TopLevel(records) => records,
        RecordList::Field(field, records) => {
            tracing::debug!("Found satellite list under '{}' ({} records)", field, records.len());
            records
        }
        RecordList::Missing => {
            tracing::warn!("Upstream payload holds no satellite array, treating as empty");
            return Vec::new();
        }
    };

    let mut sets = Vec::with_capacity(records.len());
    for record in records {
        if let Some(set) = extract_record(record) {
            sets.push(set);
        }
    }
    sets
}

fn extract_record(record: &Value) -> Option<ElementSet> {
    let line1 = non_empty_str(record.get("tle1")?)?.trim();
    let line2 = non_empty_str(record.get("tle2")?)?.trim();
    let catalog_id = parse_catalog_id(line1)?;

    let name = match record.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("Satellite {catalog_id}"),
    };

    Some(ElementSet {
        catalog_id,
        name,
        line1: line1.to_string(),
        line2: line2.to_string(),
    })
}

fn non_empty_str(value: &Value) -> Option<&str> {
    match value.as_str() {
        Some(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Parse the 5-digit catalog number from TLE line 1
pub fn parse_catalog_id(line1: &str) -> Option<u32> {
    let caps = CATALOG_ID_RE.captures(line1.trim_start())?;
    caps[1].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: u32) -> Value {
        json!({
            "name": format!("SAT-{id}"),
            "tle1": format!("1 {id:05}U 98067A   24097.81509444  .00011771  00000-0  21418-3 0  9995"),
            "tle2": format!("2 {id:05}  51.6405 309.2692 0004524  27.2554  67.1361 15.50092263447618"),
        })
    }

    #[test]
    fn test_all_payload_shapes_yield_same_list() {
        let records = vec![record(25544), record(43013)];
        let expected = extract_element_sets(&Value::Array(records.clone()));
        assert_eq!(expected.len(), 2);

        for field in ["sats", "satellites", "data", "results", "items"] {
            let payload = json!({ field: records.clone() });
            assert_eq!(extract_element_sets(&payload), expected, "field '{field}'");
        }
    }

    #[test]
    fn test_unrecognized_shape_yields_empty_list() {
        assert!(extract_element_sets(&json!({"foo": "bar"})).is_empty());
        assert!(extract_element_sets(&json!(42)).is_empty());
        assert!(extract_element_sets(&Value::Null).is_empty());
    }

    #[test]
    fn test_malformed_records_are_dropped_without_side_effects() {
        let payload = json!([
            record(10001),
            { "name": "NO LINES" },
            { "tle1": "1 10002U", "tle2": "" },
            { "tle1": "garbage line one", "tle2": "2 10003" },
            record(10004),
        ]);

        let sets = extract_element_sets(&payload);
        let ids: Vec<u32> = sets.iter().map(|s| s.catalog_id).collect();
        assert_eq!(ids, vec![10001, 10004]);
    }

    #[test]
    fn test_catalog_id_parse() {
        assert_eq!(
            parse_catalog_id("1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927"),
            Some(25544)
        );
        // leading zeros are numeric, not positional
        assert_eq!(parse_catalog_id("1 00005U 58002B   00179.78495062  .00000023"), Some(5));
        assert_eq!(parse_catalog_id("2 25544  51.6416"), None);
        assert_eq!(parse_catalog_id(""), None);
    }

    #[test]
    fn test_missing_name_gets_placeholder() {
        let payload = json!([{
            "tle1": "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
            "tle2": "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
        }]);
        let sets = extract_element_sets(&payload);
        assert_eq!(sets[0].name, "Satellite 25544");
    }
}
