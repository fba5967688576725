//! # aquasim
//!
//! 水槽の中を自律遊泳する魚のシミュレーションライブラリです。
//!
//! 運動コントローラ（等速遊泳と滑らか旋回）、水槽境界・障害物の
//! 衝突ポリシー、ポインタによるドラッグ操作、給餌シーケンスを、
//! 保持型シーングラフとレイピッキングの上に実装しています。
//! 描画は行いません。ホストはフレームごとに `AquariumEngine::update` を
//! 呼び、シーングラフの変換を読み出して描画に使います。

pub mod logging;
pub mod models;
pub mod scenario;
pub mod scene;
pub mod simulation;

pub use models::{
    DecorDef, DecorLoader, DragController, DragEvent, FeedPhase, FeedingSequencer, Fish,
    FoodPose, Obstacle, ObstaclePolicy, Pellet, TankBoundaryPolicy, TankVolume,
};
pub use scenario::{AquariumScenario, ScenarioError};
pub use scene::{Camera, NodeId, SceneGraph};
pub use simulation::{AquariumEngine, NodeTags, SimStats};
