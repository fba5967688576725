use crate::scene::graph::NodeId;
use glam::Vec3;

/// ピック入力の対象情報
///
/// エンジンがレイキャストとドラッグ可否の解決を済ませた上で渡します。
#[derive(Debug, Clone, Copy)]
pub struct PickTarget {
    /// ドラッグ可能と判定されたノード（ヒットノードまたはその祖先）
    pub node: NodeId,
    /// レイの交点（ワールド座標）
    pub hit_point: Vec3,
    /// ノードの現在位置（ワールド座標）
    pub node_position: Vec3,
}

/// ピック入力の処理結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragEvent {
    /// ノードを掴んだ
    Picked(NodeId),
    /// 掴んでいたノードを離した
    Dropped(NodeId),
    /// 何も起きなかった（非ドラッグ対象、または空振り）
    Ignored,
}

/// ドラッグコントローラ
///
/// ポインタ入力を、掴んだノードの水平面（X/Z）移動に対応付けます。
/// 掴んだ時点で交点とノード位置の平面オフセットを記録し、移動中は
/// 地面ノードとの交点からオフセットを差し引いた位置へノードを運びます。
/// Y座標は変更しません。
///
/// 状態遷移はピック入力で掴む、再度のピック入力で離す、の2状態です。
#[derive(Debug, Clone, Default)]
pub struct DragController {
    /// 現在掴んでいるノード
    active: Option<NodeId>,
    /// 交点とノード原点の平面オフセット（X/Zのみ有効）
    grab_offset: Vec3,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// ピック入力の処理
    ///
    /// 既にノードを掴んでいる場合は、対象にかかわらず離します。
    /// そうでなければ、渡された対象を掴んで平面オフセットを記録します。
    /// 対象がない場合は何もしません。
    pub fn on_pick(&mut self, target: Option<PickTarget>) -> DragEvent {
        if let Some(node) = self.active.take() {
            self.grab_offset = Vec3::ZERO;
            return DragEvent::Dropped(node);
        }

        match target {
            Some(target) => {
                self.active = Some(target.node);
                self.grab_offset = Vec3::new(
                    target.hit_point.x - target.node_position.x,
                    0.0,
                    target.hit_point.z - target.node_position.z,
                );
                DragEvent::Picked(target.node)
            }
            None => DragEvent::Ignored,
        }
    }

    /// 移動入力の処理
    ///
    /// ノードを掴んでいて、かつ地面との交点がある場合に、ノードの
    /// 新しいX/Z座標を返します。適用（Yを据え置いたシーンへの書き込み）は
    /// 呼び出し側の仕事です。
    ///
    /// # 引数
    ///
    /// * `ground_point` - 地面ノードとのレイ交点（なければNone）
    pub fn on_move(&self, ground_point: Option<Vec3>) -> Option<(NodeId, f32, f32)> {
        let node = self.active?;
        let point = ground_point?;
        Some((node, point.x - self.grab_offset.x, point.z - self.grab_offset.z))
    }

    /// 現在掴んでいるノード
    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    /// ドラッグ中かどうか
    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }
}
