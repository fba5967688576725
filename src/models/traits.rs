use crate::models::common::Aabb;
use crate::models::fish::Fish;
use crate::models::obstacle::ObstacleVolume;
use crate::scenario::AquariumScenario;
use glam::Vec3;

/// 全てのシミュレーションエージェントが実装する基本インターフェース
pub trait IAgent {
    /// エージェントの初期化（シナリオ設定の適用）
    fn initialize(&mut self, scenario: &AquariumScenario);

    /// エージェントIDの取得
    fn get_id(&self) -> String;

    /// エージェントがアクティブかどうか
    fn is_active(&self) -> bool;
}

/// 1フレーム分の判定コンテキスト
///
/// 衝突ポリシーの評価に必要な、そのフレームで確定済みの値をまとめたものです。
/// エンジンが毎フレーム構築し、各ポリシーに渡します。
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    /// 経過時刻（秒）
    pub time: f32,
    /// 運動コントローラが算出した候補位置
    pub candidate: Vec3,
    /// 候補位置での頭部先端点（ワールド座標）
    pub head_point: Vec3,
    /// 魚のワールドAABB
    pub fish_aabb: Aabb,
    /// 障害物のワールドAABB一覧（リスト順）
    pub obstacles: &'a [ObstacleVolume],
}

/// 方位修正の発生理由
#[derive(Debug, Clone, PartialEq)]
pub enum CorrectionReason {
    /// 側面（X/Z）の境界違反
    TankSide,
    /// 水面への到達
    TankTop,
    /// 砂面への到達
    TankSand,
    /// 障害物への頭部進入（障害物ID付き）
    Obstacle(String),
}

/// 衝突ポリシーが返す方位修正
#[derive(Debug, Clone)]
pub struct HeadingCorrection {
    /// 新しい目標方位（単位ベクトル）
    pub target_heading: Vec3,
    /// 修正の発生理由
    pub reason: CorrectionReason,
    /// このフレームの候補位置を破棄するかどうか
    pub discard_candidate: bool,
}

/// 衝突ポリシーのインターフェース
///
/// 違反を検知した場合に新しい目標方位を提案します。違反がなければNoneです。
pub trait ICollisionPolicy {
    fn evaluate(
        &self,
        fish: &Fish,
        context: &FrameContext<'_>,
        rng: &mut fastrand::Rng,
    ) -> Option<HeadingCorrection>;
}
