use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::types::{ElementSet, SelectionEntry};
use crate::errors::{Result, TrackerError};

/// 持久化选择文件名
const SELECTION_FILE: &str = "selection.json";

/// 工作集存储
///
/// 持有持久化的卫星工作集。工作集是追加式的：条目一经选入永不删除，
/// 规模单调不减且不超过 target_count（稳定性优先于新鲜度）。
/// 持久化文件是唯一权威，进程内存不保存状态，
/// 多个进程实例共享同一数据目录时保持一致。
pub struct SelectionStore {
    data_dir: PathBuf,
    target_count: usize,
    /// 串行化 reconcile 的读-改-写全过程（单写者）
    write_lock: Mutex<()>,
}

impl SelectionStore {
    /// 创建工作集存储
    ///
    /// # Arguments
    /// * `data_dir` - 数据目录路径
    /// * `target_count` - 工作集目标规模
    pub fn new<P: AsRef<Path>>(data_dir: P, target_count: usize) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            target_count,
            write_lock: Mutex::new(()),
        }
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    fn selection_path(&self) -> PathBuf {
        self.data_dir.join(SELECTION_FILE)
    }

    /// 确保数据目录存在
    async fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir).await.map_err(|e| {
                TrackerError::PersistenceFailure(format!("failed to create data directory: {e}"))
            })?;
            info!("Created data directory: {:?}", self.data_dir);
        }
        Ok(())
    }

    /// 加载持久化的选择
    ///
    /// 文件缺失返回空；读取或解析失败同样按 Empty 处理并记录日志，
    /// 下一次 reconcile 会重新初始化（非致命）。
    pub async fn load(&self) -> Vec<SelectionEntry> {
        let path = self.selection_path();

        if !path.exists() {
            debug!("Selection file does not exist: {:?}", path);
            return Vec::new();
        }

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read selection file: {}, treating as empty", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<SelectionEntry>>(&content) {
            Ok(entries) => {
                debug!("Loaded {} selection entries", entries.len());
                entries
            }
            Err(e) => {
                warn!("Failed to parse selection file: {}, reinitializing", e);
                Vec::new()
            }
        }
    }

    /// 调和可用根数与持久化工作集
    ///
    /// 1. 无持久化选择：按目录编号升序取最多 target_count 条去重条目，
    ///    index 从 1 起顺序分配，selected_at = updated_at = now
    /// 2. 已有选择：目录编号仍出现在 available 中的条目原地刷新
    ///    根数与 updated_at；缺席的条目保持不变（不删除）
    /// 3. 不足 target_count：按目录编号升序补充尚未入选的条目，
    ///    直到达到 target_count 或 available 用尽
    /// 4. 原子落盘（临时文件加重命名）；写入失败时先前的持久化状态仍然权威
    pub async fn reconcile(&self, available: &[ElementSet]) -> Result<Vec<SelectionEntry>> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.load().await;
        let now = Utc::now();

        // 同一目录编号取最后观测到的根数
        let mut latest: HashMap<u32, &ElementSet> = HashMap::new();
        for set in available {
            latest.insert(set.catalog_id, set);
        }

        if entries.is_empty() {
            let mut candidates: Vec<&ElementSet> = latest.values().copied().collect();
            candidates.sort_by_key(|set| set.catalog_id);

            for (i, set) in candidates.iter().take(self.target_count).enumerate() {
                entries.push(new_entry((i + 1) as u32, set, now));
            }
            info!(
                "Initialized selection with {} of {} available element sets",
                entries.len(),
                latest.len()
            );
        } else {
            let mut refreshed = 0;
            for entry in entries.iter_mut() {
                if let Some(set) = latest.get(&entry.catalog_id) {
                    entry.line1 = set.line1.clone();
                    entry.line2 = set.line2.clone();
                    entry.name = Some(set.name.clone());
                    entry.updated_at = now;
                    refreshed += 1;
                }
            }
            debug!("Refreshed {} of {} selection entries", refreshed, entries.len());

            if entries.len() < self.target_count {
                let selected: HashSet<u32> = entries.iter().map(|e| e.catalog_id).collect();
                let mut additions: Vec<&ElementSet> = latest
                    .values()
                    .filter(|set| !selected.contains(&set.catalog_id))
                    .copied()
                    .collect();
                additions.sort_by_key(|set| set.catalog_id);

                let room = self.target_count - entries.len();
                let mut next_index = entries.len() as u32 + 1;
                let mut added = 0;
                for set in additions.into_iter().take(room) {
                    entries.push(new_entry(next_index, set, now));
                    next_index += 1;
                    added += 1;
                }
                if added > 0 {
                    info!("Topped up selection by {} to {} entries", added, entries.len());
                }
            }
        }

        self.persist(&entries).await?;
        Ok(entries)
    }

    /// 原子写入：先写临时文件再重命名覆盖
    async fn persist(&self, entries: &[SelectionEntry]) -> Result<()> {
        self.ensure_data_dir().await?;

        let path = self.selection_path();
        let tmp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(entries).map_err(|e| {
            TrackerError::PersistenceFailure(format!("failed to serialize selection: {e}"))
        })?;

        fs::write(&tmp_path, content).await.map_err(|e| {
            TrackerError::PersistenceFailure(format!("failed to write selection file: {e}"))
        })?;
        fs::rename(&tmp_path, &path).await.map_err(|e| {
            TrackerError::PersistenceFailure(format!("failed to replace selection file: {e}"))
        })?;

        debug!("Persisted {} selection entries", entries.len());
        Ok(())
    }
}

fn new_entry(index: u32, set: &ElementSet, now: chrono::DateTime<Utc>) -> SelectionEntry {
    SelectionEntry {
        index,
        catalog_id: set.catalog_id,
        name: Some(set.name.clone()),
        line1: set.line1.clone(),
        line2: set.line2.clone(),
        selected_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn element_set(id: u32) -> ElementSet {
        ElementSet {
            catalog_id: id,
            name: format!("SAT-{id}"),
            line1: format!("1 {id:05}U 98067A   24097.81509444  .00011771  00000-0  21418-3 0  9995"),
            line2: format!("2 {id:05}  51.6405 309.2692 0004524  27.2554  67.1361 15.50092263447618"),
        }
    }

    #[tokio::test]
    async fn test_initial_population_takes_lowest_catalog_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = SelectionStore::new(temp_dir.path(), 2);

        // 3 个有效根数对，目标规模 2
        let available = vec![element_set(30003), element_set(30001), element_set(30002)];
        let entries = store.reconcile(&available).await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].catalog_id, 30001);
        assert_eq!(entries[0].index, 1);
        assert_eq!(entries[1].catalog_id, 30002);
        assert_eq!(entries[1].index, 2);
    }

    #[tokio::test]
    async fn test_top_up_preserves_existing_indexes() {
        let temp_dir = TempDir::new().unwrap();

        let store = SelectionStore::new(temp_dir.path(), 2);
        store
            .reconcile(&[element_set(30001), element_set(30002), element_set(30003)])
            .await
            .unwrap();

        // 之后目标规模升到 3，目录多出一条
        let store = SelectionStore::new(temp_dir.path(), 3);
        let entries = store
            .reconcile(&[
                element_set(30001),
                element_set(30002),
                element_set(30003),
                element_set(30004),
            ])
            .await
            .unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!((entries[0].catalog_id, entries[0].index), (30001, 1));
        assert_eq!((entries[1].catalog_id, entries[1].index), (30002, 2));
        assert_eq!((entries[2].catalog_id, entries[2].index), (30003, 3));
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = SelectionStore::new(temp_dir.path(), 5);

        let available = vec![element_set(30001), element_set(30002)];
        let first = store.reconcile(&available).await.unwrap();
        let second = store.reconcile(&available).await.unwrap();

        // 第二次只做原地刷新，不插入
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.catalog_id, b.catalog_id);
            assert_eq!(a.index, b.index);
            assert_eq!(a.selected_at, b.selected_at);
        }
    }

    #[tokio::test]
    async fn test_size_monotonic_and_bounded() {
        let temp_dir = TempDir::new().unwrap();
        let store = SelectionStore::new(temp_dir.path(), 2);

        let entries = store
            .reconcile(&[element_set(30001), element_set(30002), element_set(30003)])
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);

        // 上游缺席不收缩
        let entries = store.reconcile(&[element_set(30009)]).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].catalog_id, 30001);
        assert_eq!(entries[1].catalog_id, 30002);
    }

    #[tokio::test]
    async fn test_absent_entries_keep_stale_lines() {
        let temp_dir = TempDir::new().unwrap();
        let store = SelectionStore::new(temp_dir.path(), 2);

        store
            .reconcile(&[element_set(30001), element_set(30002)])
            .await
            .unwrap();

        let mut updated = element_set(30001);
        updated.line1 =
            "1 30001U 98067A   24200.00000000  .00011771  00000-0  21418-3 0  9995".to_string();
        let before = store.load().await;
        let entries = store.reconcile(&[updated.clone()]).await.unwrap();

        assert_eq!(entries[0].line1, updated.line1);
        assert!(entries[0].updated_at >= before[0].updated_at);
        // 30002 缺席：根数保持原值
        assert_eq!(entries[1].line1, before[1].line1);
        assert_eq!(entries[1].updated_at, before[1].updated_at);
    }

    #[tokio::test]
    async fn test_no_duplicate_catalog_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = SelectionStore::new(temp_dir.path(), 10);

        // available 含重复编号
        let entries = store
            .reconcile(&[element_set(30001), element_set(30001), element_set(30002)])
            .await
            .unwrap();

        let mut ids: Vec<u32> = entries.iter().map(|e| e.catalog_id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[tokio::test]
    async fn test_corrupt_selection_file_reinitializes() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(SELECTION_FILE), "not json at all")
            .await
            .unwrap();

        let store = SelectionStore::new(temp_dir.path(), 2);
        assert!(store.load().await.is_empty());

        let entries = store.reconcile(&[element_set(30001)]).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].index, 1);
    }
}
