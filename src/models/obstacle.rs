use crate::models::{
    common::{Aabb, math_utils},
    fish::Fish,
    traits::{CorrectionReason, FrameContext, HeadingCorrection, ICollisionPolicy},
};
use crate::scene::graph::NodeId;
use crate::scenario::AquariumScenario;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, warn};

/// 静的障害物
///
/// 魚の頭部が侵入してはならない装飾ノード（岩や貝殻など）です。
/// ワールドAABBは毎フレーム、シーングラフから取り直します。
/// ドラッグで移動された場合も判定が追従するためです。
#[derive(Debug, Clone)]
pub struct Obstacle {
    /// 障害物の一意識別子
    pub id: String,
    /// 対応するシーンノード
    pub node: NodeId,
    /// ポインタでドラッグ可能かどうか
    pub draggable: bool,
}

/// 1フレーム分の障害物判定ボリューム
///
/// リスト順を保ったまま、各障害物のワールドAABBを確定させたものです。
#[derive(Debug, Clone)]
pub struct ObstacleVolume {
    pub id: String,
    pub aabb: Aabb,
}

/// 障害物の衝突ポリシー
///
/// 候補位置での頭部先端点が障害物のAABBに含まれる場合、障害物中心から
/// 魚へ向かう水平方向（小角の乱数ヨーで摂動）を新しい目標方位とします。
/// 候補位置は破棄され、魚はその場で向き直ります。
///
/// 判定はリスト順で、最初に見つかった障害物のみを使用します。
#[derive(Debug, Clone)]
pub struct ObstaclePolicy {
    /// 反射方向に加えるヨー摂動の範囲（度、±）
    pub yaw_jitter_deg: f32,
}

impl ObstaclePolicy {
    pub fn from_scenario(scenario: &AquariumScenario) -> Self {
        Self {
            yaw_jitter_deg: scenario.steering.obstacle_turn_deg,
        }
    }

    fn away_heading(&self, fish: &Fish, volume: &ObstacleVolume, rng: &mut fastrand::Rng) -> Vec3 {
        let from_center = fish.position - volume.aabb.center();
        // 魚が障害物中心の真上にいる場合は後退方向を基準にする
        let fallback = math_utils::normalize_or(-math_utils::horizontal(fish.heading), Vec3::Z);
        let away = math_utils::normalize_or(math_utils::horizontal(from_center), fallback);

        let angle = math_utils::deg_to_rad((rng.f32() * 2.0 - 1.0) * self.yaw_jitter_deg);
        let perturbed = math_utils::rotate_about_vertical(away, angle);

        // 水平反射に既存の鉛直成分を残す
        let target = Vec3::new(perturbed.x, fish.heading.y, perturbed.z);
        math_utils::normalize_or(target, perturbed)
    }
}

impl ICollisionPolicy for ObstaclePolicy {
    fn evaluate(
        &self,
        fish: &Fish,
        context: &FrameContext<'_>,
        rng: &mut fastrand::Rng,
    ) -> Option<HeadingCorrection> {
        let hit = context
            .obstacles
            .iter()
            .find(|volume| volume.aabb.contains_point(context.head_point))?;

        Some(HeadingCorrection {
            target_heading: self.away_heading(fish, hit, rng),
            reason: CorrectionReason::Obstacle(hit.id.clone()),
            discard_candidate: true,
        })
    }
}

/// 非同期読み込みされる装飾障害物の定義
///
/// 装飾ファイル（YAML）の1エントリです。読み込み完了後に
/// 共有の障害物リストへ追記されます。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecorDef {
    pub id: String,
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
    pub draggable: bool,
}

/// 装飾ファイル全体
#[derive(Debug, Deserialize, Serialize)]
struct DecorFile {
    decor: Vec<DecorDef>,
}

/// 装飾障害物の非同期ローダ
///
/// 読み込みタスクが任意の後続フレームで完了し、チャネル経由で定義を
/// 届けます。エンジンは毎フレーム先頭で `poll` を呼び、届いた定義を
/// 障害物リストへ追記します（追記のみ、順序以外の同期は不要）。
/// 読み込み失敗時はその障害物が現れないだけで、エラーにはなりません。
#[derive(Debug)]
pub struct DecorLoader {
    receiver: UnboundedReceiver<DecorDef>,
}

impl DecorLoader {
    /// 読み込みタスクを起動してローダを作成
    ///
    /// # 引数
    ///
    /// * `handle` - タスクを載せるtokioランタイムのハンドル
    /// * `path` - 装飾ファイル（YAML）のパス
    pub fn spawn(handle: &tokio::runtime::Handle, path: PathBuf) -> Self {
        let (sender, receiver) = unbounded_channel();
        handle.spawn_blocking(move || load_decor_file(path, sender));
        Self { receiver }
    }

    /// チャネルとローダの組を作成（テストおよび手動注入用）
    pub fn channel() -> (UnboundedSender<DecorDef>, Self) {
        let (sender, receiver) = unbounded_channel();
        (sender, Self { receiver })
    }

    /// 届いている定義をすべて取り出す
    pub fn poll(&mut self) -> Vec<DecorDef> {
        let mut loaded = Vec::new();
        while let Ok(def) = self.receiver.try_recv() {
            loaded.push(def);
        }
        loaded
    }
}

fn load_decor_file(path: PathBuf, sender: UnboundedSender<DecorDef>) {
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "DECOR_LOAD_FAILED: 装飾ファイルを読み込めませんでした"
            );
            return;
        }
    };

    let file: DecorFile = match serde_yaml::from_str(&contents) {
        Ok(file) => file,
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "DECOR_LOAD_FAILED: 装飾ファイルを解析できませんでした"
            );
            return;
        }
    };

    debug!(
        path = %path.display(),
        count = file.decor.len(),
        "DECOR_LOADED: 装飾ファイルを読み込みました"
    );

    for def in file.decor {
        // 受信側が先に破棄された場合は残りを捨てるだけでよい
        if sender.send(def).is_err() {
            break;
        }
    }
}
