use crate::models::common::Aabb;
use glam::{Mat4, Quat, Vec3};

/// シーンノードの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// ローカル変換（位置・回転・スケール）
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// 変換行列を生成
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// 空間ノード
///
/// 親子関係とローカル変換を持つだけの保持型ノードです。
/// `half_extents` が非ゼロのノードは固有の直方体ボリュームを持ち、
/// AABB計算とレイ判定の対象になります（ゼロなら純粋なグループ）。
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub half_extents: Vec3,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// 保持型シーングラフ
///
/// ノードをアリーナ（Vec）で所有し、識別子経由で操作します。
/// 生成と接続はシーン構築時に行い、フレーム中は変換の更新と
/// 問い合わせのみを行う想定です。
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// ノードを生成（親なしのルートとして追加）
    pub fn create_node(&mut self, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.to_string(),
            transform: Transform::identity(),
            half_extents: Vec3::ZERO,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// 子ノードを親へ接続（既存の親からは外れる）
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        if parent == child {
            return;
        }
        if let Some(old_parent) = self.nodes[child.0].parent {
            self.nodes[old_parent.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec3) {
        self.nodes[id.0].transform.position = position;
    }

    pub fn set_rotation(&mut self, id: NodeId, rotation: Quat) {
        self.nodes[id.0].transform.rotation = rotation;
    }

    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) {
        self.nodes[id.0].transform.scale = scale;
    }

    pub fn set_half_extents(&mut self, id: NodeId, half_extents: Vec3) {
        self.nodes[id.0].half_extents = half_extents;
    }

    /// ルートノード（親を持たないノード）の一覧
    pub fn roots(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|id| self.nodes[id.0].parent.is_none())
            .collect()
    }

    /// ワールド変換行列（親方向へ合成）
    pub fn world_transform(&self, id: NodeId) -> Mat4 {
        let local = self.nodes[id.0].transform.matrix();
        match self.nodes[id.0].parent {
            Some(parent) => self.world_transform(parent) * local,
            None => local,
        }
    }

    /// ワールド位置
    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world_transform(id).transform_point3(Vec3::ZERO)
    }

    /// ノード自身とその全子孫（深さ優先）
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            for child in &self.nodes[current.0].children {
                stack.push(*child);
            }
        }
        result
    }

    /// `ancestor` が `node` 自身またはその祖先かどうか
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    /// ノード単体のワールドAABB（ボリュームを持たない場合はNone）
    pub fn node_world_aabb(&self, id: NodeId) -> Option<Aabb> {
        let half = self.nodes[id.0].half_extents;
        if half == Vec3::ZERO {
            return None;
        }
        let world = self.world_transform(id);
        let local = Aabb::from_center_half_extents(Vec3::ZERO, half);
        let corners: Vec<Vec3> = local
            .corners()
            .iter()
            .map(|corner| world.transform_point3(*corner))
            .collect();
        Aabb::from_points(&corners)
    }

    /// 部分木全体のワールドAABB
    ///
    /// ボリュームを持つ子孫ノードのAABBをすべて合成します。
    /// 部分木にボリュームが1つもない場合はNoneです。
    pub fn world_aabb(&self, id: NodeId) -> Option<Aabb> {
        self.descendants(id)
            .iter()
            .filter_map(|node| self.node_world_aabb(*node))
            .reduce(|acc, aabb| acc.union(&aabb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_world_transform_composes_parent_chain() {
        let mut scene = SceneGraph::new();
        let parent = scene.create_node("parent");
        let child = scene.create_node("child");
        scene.attach(parent, child);

        scene.set_position(parent, Vec3::new(10.0, 0.0, 0.0));
        scene.set_position(child, Vec3::new(0.0, 5.0, 0.0));

        let world = scene.world_position(child);
        assert_relative_eq!(world.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(world.y, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_parent_rotation_moves_child() {
        let mut scene = SceneGraph::new();
        let parent = scene.create_node("parent");
        let child = scene.create_node("child");
        scene.attach(parent, child);

        scene.set_rotation(parent, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        scene.set_position(child, Vec3::new(0.0, 0.0, 2.0));

        // +Z の子はY軸90度回転で +X へ回る
        let world = scene.world_position(child);
        assert_relative_eq!(world.x, 2.0, epsilon = 1e-4);
        assert_relative_eq!(world.z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_subtree_world_aabb_unions_volumes() {
        let mut scene = SceneGraph::new();
        let group = scene.create_node("group");
        let a = scene.create_node("a");
        let b = scene.create_node("b");
        scene.attach(group, a);
        scene.attach(group, b);

        scene.set_position(a, Vec3::new(-2.0, 0.0, 0.0));
        scene.set_half_extents(a, Vec3::ONE);
        scene.set_position(b, Vec3::new(3.0, 0.0, 0.0));
        scene.set_half_extents(b, Vec3::ONE);

        let aabb = scene.world_aabb(group).expect("subtree has volumes");
        assert_relative_eq!(aabb.min.x, -3.0, epsilon = 1e-5);
        assert_relative_eq!(aabb.max.x, 4.0, epsilon = 1e-5);

        // グループ自身はボリュームを持たない
        assert!(scene.node_world_aabb(group).is_none());
    }

    #[test]
    fn test_is_ancestor_or_self() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node("root");
        let mid = scene.create_node("mid");
        let leaf = scene.create_node("leaf");
        scene.attach(root, mid);
        scene.attach(mid, leaf);

        assert!(scene.is_ancestor_or_self(root, leaf));
        assert!(scene.is_ancestor_or_self(leaf, leaf));
        assert!(!scene.is_ancestor_or_self(leaf, root));
    }

    #[test]
    fn test_roots_excludes_attached_nodes() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node("root");
        let child = scene.create_node("child");
        scene.attach(root, child);
        let other = scene.create_node("other");

        let roots = scene.roots();
        assert!(roots.contains(&root));
        assert!(roots.contains(&other));
        assert!(!roots.contains(&child));
    }
}
