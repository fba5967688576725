// 保持型シーングラフ（ノード生成・接続・変換・AABB問い合わせ）
pub mod graph;

// 透視投影カメラとピッキングレイ生成
pub mod camera;

// レイキャストとポインタ座標変換
pub mod picking;

pub use camera::Camera;
pub use graph::{NodeId, SceneGraph, SceneNode, Transform};
pub use picking::{Ray, RayHit, intersect_ray_aabb, pointer_to_ndc, raycast};
