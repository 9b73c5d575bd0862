use chrono::Utc;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

use super::api_client;
use super::cache::PositionCache;
use super::extractor;
use super::nearest::NearestSet;
use super::propagate::{self, Observer};
use super::selection::SelectionStore;
use super::types::{ElementSet, PositionSample, SelectionEntry, SnapshotRecord};
use crate::errors::{Result, TrackerError};

/// 默认工作集规模
pub const DEFAULT_TARGET_COUNT: usize = 50;

/// 卫星跟踪管理器
///
/// 把上游目录、工作集存储、传播计算与位置快照组合成两条路径：
/// - 刷新路径（拉取式，由请求触发）：fetch → extract →（首次入库时
///   近邻筛选）→ reconcile → 重算并覆盖快照
/// - 查询路径：优先返回快照，缺失时基于当前工作集重算，
///   完全无数据时返回 NotFound
///
/// 不持有进程内状态；持久化文件是唯一权威。
pub struct SatelliteManager {
    store: SelectionStore,
    cache: PositionCache,
    upstream_url: String,
}

impl SatelliteManager {
    /// 创建管理器
    ///
    /// # Arguments
    /// * `data_dir` - 数据目录（选择文件与快照文件都放在这里）
    /// * `target_count` - 工作集目标规模
    /// * `upstream_url` - 上游目录端点
    pub fn new<P: AsRef<Path>>(data_dir: P, target_count: usize, upstream_url: impl Into<String>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            store: SelectionStore::new(&data_dir, target_count),
            cache: PositionCache::new(&data_dir),
            upstream_url: upstream_url.into(),
        }
    }

    /// 原样取回上游目录（供代理端点使用）
    pub async fn raw_catalog(&self, observer: Observer) -> Result<Value> {
        api_client::fetch_catalog(&self.upstream_url, observer.latitude_deg, observer.longitude_deg)
            .await
    }

    /// 刷新路径入口：拉取上游目录并入库
    pub async fn refresh(&self, observer: Observer) -> Result<Vec<PositionSample>> {
        let payload = self.raw_catalog(observer).await?;
        self.ingest_payload(&payload, observer).await
    }

    /// 刷新路径的入库部分
    ///
    /// 首次建立工作集时先按观测者距离做近邻筛选，再交给 reconcile
    /// 按目录编号升序定序；之后的刷新把完整候选池交给 reconcile
    /// 做原地刷新与补充。
    pub async fn ingest_payload(&self, payload: &Value, observer: Observer) -> Result<Vec<PositionSample>> {
        let available = extractor::extract_element_sets(payload);
        info!("Extracted {} element sets from upstream catalog", available.len());

        let pool = if self.store.load().await.is_empty() {
            self.nearest_pool(available, observer)
        } else {
            available
        };

        let entries = self.store.reconcile(&pool).await?;
        Ok(self.recompute_snapshot(&entries, Some(observer)).await)
    }

    /// 查询路径：见 PositionCache 的无 TTL 约定
    pub async fn positions(&self) -> Result<Vec<PositionSample>> {
        if let Some(samples) = self.cache.load().await {
            debug!("Serving {} positions from snapshot", samples.len());
            return Ok(samples);
        }

        let entries = self.store.load().await;
        if entries.is_empty() {
            return Err(TrackerError::NotFound);
        }

        debug!("No usable snapshot, recomputing from {} selection entries", entries.len());
        Ok(self.recompute_snapshot(&entries, None).await)
    }

    /// 初次入库的近邻筛选：逐个传播候选取观测者距离，
    /// 保留最近的 target_count 个（距离相同按目录编号升序取舍）
    fn nearest_pool(&self, available: Vec<ElementSet>, observer: Observer) -> Vec<ElementSet> {
        let now = Utc::now();
        let total = available.len();

        let mut nearest = NearestSet::new(self.store.target_count());
        for set in available {
            match propagate::candidate_distance_m(&set, now, observer) {
                Some(distance_m) => {
                    nearest.offer(distance_m, set.catalog_id, set);
                }
                None => debug!("Skipping candidate {} (not propagable)", set.catalog_id),
            }
        }

        let pool: Vec<ElementSet> = nearest
            .into_sorted()
            .into_iter()
            .map(|candidate| candidate.value)
            .collect();
        info!("Nearest-candidate ingestion kept {} of {} candidates", pool.len(), total);
        pool
    }

    /// 以当前工作集整体重算位置，并尽力持久化快照
    /// （持久化失败只记日志，样本照常返回）
    async fn recompute_snapshot(
        &self,
        entries: &[SelectionEntry],
        observer: Option<Observer>,
    ) -> Vec<PositionSample> {
        let samples = propagate::compute_positions(entries, Utc::now(), observer);
        let records = snapshot_records(entries, &samples);

        if let Err(e) = self.cache.save(&records).await {
            warn!("Failed to persist position snapshot: {}", e);
        }

        samples
    }
}

/// 样本连同其根数行写入快照，便于以后恢复目录编号
fn snapshot_records(entries: &[SelectionEntry], samples: &[PositionSample]) -> Vec<SnapshotRecord> {
    samples
        .iter()
        .filter_map(|sample| {
            let entry = entries.iter().find(|e| e.catalog_id == sample.catalog_id)?;
            Some(SnapshotRecord {
                index: sample.index,
                catalog_id: Some(sample.catalog_id),
                name: Some(sample.name.clone()),
                line1: entry.line1.clone(),
                line2: entry.line2.clone(),
                latitude: sample.latitude_deg,
                longitude: sample.longitude_deg,
                altitude: sample.altitude_m,
            })
        })
        .collect()
}
