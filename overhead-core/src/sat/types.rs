use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 轨道根数集（TLE 两行格式）
///
/// 提取后不可变；同一目录编号的更新通过整体替换完成。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementSet {
    /// 目录编号（从 line1 解析的 5 位 NORAD 编号，唯一键）
    pub catalog_id: u32,

    /// 卫星名称
    pub name: String,

    /// TLE 第一行
    pub line1: String,

    /// TLE 第二行
    pub line2: String,
}

/// 工作集条目（持久化选择的单条记录）
///
/// 一经选入永不删除；工作集只增不减，以保证刷新之间
/// 被跟踪的卫星集合不会跳变。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionEntry {
    /// 显示顺序（从 1 开始，一经分配保持稳定）
    pub index: u32,

    /// 目录编号（存储内唯一）
    pub catalog_id: u32,

    /// 卫星名称（旧版选择文件没有该字段）
    #[serde(default)]
    pub name: Option<String>,

    /// TLE 第一行（观测到更新的根数时原地刷新）
    pub line1: String,

    /// TLE 第二行
    pub line2: String,

    /// 首次选入时间
    pub selected_at: DateTime<Utc>,

    /// 最近一次根数刷新时间
    pub updated_at: DateTime<Utc>,
}

/// 位置样本（派生数据，整体替换，从不原地修改）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSample {
    pub index: u32,

    pub catalog_id: u32,

    pub name: String,

    /// 纬度（度）
    pub latitude_deg: f64,

    /// 经度（度，规范分支 [-180, 180)）
    pub longitude_deg: f64,

    /// 高度（米）
    pub altitude_m: f64,

    /// 距观测者的大圆地表距离（米）；未提供观测者时为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

/// 持久化位置快照中的单条记录
///
/// 旧版快照可能缺少目录编号，读取时从存储的 line1 重新解析。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub index: u32,

    #[serde(default)]
    pub catalog_id: Option<u32>,

    #[serde(default)]
    pub name: Option<String>,

    pub line1: String,

    pub line2: String,

    pub latitude: f64,

    pub longitude: f64,

    pub altitude: f64,
}
