// 基本的なデータ型と数学ユーティリティ
pub mod common;

// エージェントと衝突ポリシーの基本インターフェース（trait）定義
pub mod traits;

// 各モデルの実装
pub mod drag;
pub mod feeding;
pub mod fish;
pub mod obstacle;
pub mod tank;

// 便利な re-export
pub use common::*;
pub use drag::{DragController, DragEvent, PickTarget};
pub use feeding::{FeedPhase, FeedingSequencer, FoodPose, Pellet};
pub use fish::Fish;
pub use obstacle::{DecorDef, DecorLoader, Obstacle, ObstaclePolicy, ObstacleVolume};
pub use tank::{BoundaryViolation, TankBoundaryPolicy, TankVolume};
pub use traits::*;
