use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::extractor::parse_catalog_id;
use super::types::{PositionSample, SnapshotRecord};
use crate::errors::{Result, TrackerError};

/// 位置快照文件名
const SNAPSHOT_FILE: &str = "positions.json";

/// 位置快照缓存
///
/// 无 TTL：快照只会被刷新路径整体覆盖，查询路径不判断新旧。
/// 想要新鲜位置的调用方必须走刷新路径。
pub struct PositionCache {
    data_dir: PathBuf,
}

impl PositionCache {
    /// 创建快照缓存
    ///
    /// # Arguments
    /// * `data_dir` - 数据目录路径（与工作集存储共用）
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    /// 加载持久化快照
    ///
    /// 缺失或解析失败返回 None（由调用方基于工作集重新计算）；
    /// 缺少目录编号的记录从存储的 line1 重新解析。
    pub async fn load(&self) -> Option<Vec<PositionSample>> {
        let path = self.snapshot_path();

        if !path.exists() {
            debug!("Snapshot file does not exist: {:?}", path);
            return None;
        }

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read snapshot file: {}, recomputing", e);
                return None;
            }
        };

        let records: Vec<SnapshotRecord> = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to parse snapshot file: {}, recomputing", e);
                return None;
            }
        };

        let samples: Vec<PositionSample> =
            records.into_iter().filter_map(sample_from_record).collect();
        debug!("Loaded {} position samples from snapshot", samples.len());
        Some(samples)
    }

    /// 整体写入快照（临时文件加重命名，不留半成品）
    ///
    /// 调用方按尽力而为处理：失败记日志降级为每次请求重算，
    /// 绝不让请求路径因此失败。
    pub async fn save(&self, records: &[SnapshotRecord]) -> Result<()> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir).await.map_err(|e| {
                TrackerError::PersistenceFailure(format!("failed to create data directory: {e}"))
            })?;
            info!("Created data directory: {:?}", self.data_dir);
        }

        let path = self.snapshot_path();
        let tmp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(records).map_err(|e| {
            TrackerError::PersistenceFailure(format!("failed to serialize snapshot: {e}"))
        })?;

        fs::write(&tmp_path, content).await.map_err(|e| {
            TrackerError::PersistenceFailure(format!("failed to write snapshot file: {e}"))
        })?;
        fs::rename(&tmp_path, &path).await.map_err(|e| {
            TrackerError::PersistenceFailure(format!("failed to replace snapshot file: {e}"))
        })?;

        debug!("Persisted {} snapshot records", records.len());
        Ok(())
    }
}

/// 快照记录转位置样本；无法恢复目录编号的记录丢弃
fn sample_from_record(record: SnapshotRecord) -> Option<PositionSample> {
    let catalog_id = match record.catalog_id {
        Some(id) => id,
        None => parse_catalog_id(&record.line1)?,
    };

    Some(PositionSample {
        index: record.index,
        catalog_id,
        name: record
            .name
            .unwrap_or_else(|| format!("Satellite {catalog_id}")),
        latitude_deg: record.latitude,
        longitude_deg: record.longitude,
        altitude_m: record.altitude,
        distance_m: None,
    })
}
