use crate::models::common::Aabb;
use crate::scene::graph::{NodeId, SceneGraph};
use glam::{Vec2, Vec3};

/// ピッキング用のレイ
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// 始点（ワールド座標）
    pub origin: Vec3,
    /// 方向（正規化済み）
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// レイ上の距離tの点
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// レイ交差の結果
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// ヒットしたノード
    pub node: NodeId,
    /// 始点から交点までの距離
    pub distance: f32,
    /// 交点（ワールド座標）
    pub point: Vec3,
}

/// ビューポートのピクセル座標を正規化デバイス座標へ変換
///
/// X: 左端-1、右端+1。Y: 上端+1、下端-1。
pub fn pointer_to_ndc(x: f32, y: f32, width: f32, height: f32) -> Vec2 {
    Vec2::new(2.0 * x / width - 1.0, 1.0 - 2.0 * y / height)
}

/// スラブ法によるレイとAABBの交差判定
///
/// 交差する場合は始点から進入点までの距離を返します。
/// 始点がAABB内部にある場合は距離0です。
pub fn intersect_ray_aabb(ray: &Ray, aabb: &Aabb) -> Option<f32> {
    let inverse = ray.direction.recip();
    let t_lower = (aabb.min - ray.origin) * inverse;
    let t_upper = (aabb.max - ray.origin) * inverse;

    let t_near = t_lower.min(t_upper);
    let t_far = t_lower.max(t_upper);

    let t_enter = t_near.max_element();
    let t_exit = t_far.min_element();

    if t_enter <= t_exit && t_exit >= 0.0 {
        Some(t_enter.max(0.0))
    } else {
        None
    }
}

/// ノード群に対するレイキャスト
///
/// `recursive` が真なら各ノードの子孫も対象に含めます。ボリュームを
/// 持つノードだけが判定され、ヒットは距離の昇順で返されます。
pub fn raycast(
    scene: &SceneGraph,
    ray: &Ray,
    nodes: &[NodeId],
    recursive: bool,
) -> Vec<RayHit> {
    let mut candidates: Vec<NodeId> = Vec::new();
    for node in nodes {
        if recursive {
            candidates.extend(scene.descendants(*node));
        } else {
            candidates.push(*node);
        }
    }
    candidates.dedup();

    let mut hits: Vec<RayHit> = candidates
        .into_iter()
        .filter_map(|node| {
            let aabb = scene.node_world_aabb(node)?;
            let distance = intersect_ray_aabb(ray, &aabb)?;
            Some(RayHit {
                node,
                distance,
                point: ray.point_at(distance),
            })
        })
        .collect();

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pointer_to_ndc_corners() {
        let center = pointer_to_ndc(640.0, 360.0, 1280.0, 720.0);
        assert_relative_eq!(center.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(center.y, 0.0, epsilon = 1e-6);

        let top_left = pointer_to_ndc(0.0, 0.0, 1280.0, 720.0);
        assert_relative_eq!(top_left.x, -1.0, epsilon = 1e-6);
        assert_relative_eq!(top_left.y, 1.0, epsilon = 1e-6);

        let bottom_right = pointer_to_ndc(1280.0, 720.0, 1280.0, 720.0);
        assert_relative_eq!(bottom_right.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(bottom_right.y, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ray_aabb_hit_and_miss() {
        let aabb = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE);

        let hit_ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let distance = intersect_ray_aabb(&hit_ray, &aabb).expect("ray aims at the box");
        assert_relative_eq!(distance, 9.0, epsilon = 1e-4);

        let miss_ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(intersect_ray_aabb(&miss_ray, &aabb).is_none());

        // 軸平行レイ（方向成分0）でもスラブ法が機能する
        let axis_ray = Ray::new(Vec3::new(0.5, 0.5, 0.0), Vec3::NEG_Z);
        assert!(intersect_ray_aabb(&axis_ray, &aabb).is_some());
    }

    #[test]
    fn test_ray_from_inside_returns_zero() {
        let aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(2.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(intersect_ray_aabb(&ray, &aabb), Some(0.0));
    }

    #[test]
    fn test_raycast_orders_hits_by_distance() {
        let mut scene = SceneGraph::new();
        let near = scene.create_node("near");
        scene.set_position(near, Vec3::new(0.0, 0.0, -5.0));
        scene.set_half_extents(near, Vec3::ONE);

        let far = scene.create_node("far");
        scene.set_position(far, Vec3::new(0.0, 0.0, -12.0));
        scene.set_half_extents(far, Vec3::ONE);

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hits = raycast(&scene, &ray, &[far, near], false);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, near);
        assert_eq!(hits[1].node, far);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn test_raycast_recursive_hits_children() {
        let mut scene = SceneGraph::new();
        let group = scene.create_node("group");
        let leaf = scene.create_node("leaf");
        scene.attach(group, leaf);
        scene.set_position(group, Vec3::new(0.0, 0.0, -8.0));
        scene.set_half_extents(leaf, Vec3::ONE);

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(raycast(&scene, &ray, &[group], false).is_empty());

        let hits = raycast(&scene, &ray, &[group], true);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, leaf);
    }
}
