//! # Simulation モジュール
//!
//! 水槽シミュレーションの中核となるエンジンを提供します。
//!
//! このモジュールは、フレーム駆動シミュレーションのメインループを管理し、
//! 遊泳エージェント（魚）、水槽境界、障害物、ドラッグ操作、給餌シーケンスの
//! 協調動作を制御します。全ての状態はエンジンが所有し、1フレームにつき
//! 1回の `update` 呼び出しの中で同期的に更新されます。
//!
//! ## フレーム処理順序
//!
//! 各フレームにおいて、以下の順序で処理が実行されます：
//!
//! 1. **装飾取り込み**: 非同期読み込み済みの装飾障害物をリストへ追記
//! 2. **運動計算**: 魚の候補位置と方位の算出
//! 3. **障害物判定**: 頭部進入の検知と反射方位の生成（候補破棄）
//! 4. **位置確定**: 水槽内へのクランプと確定
//! 5. **境界判定**: 水槽境界違反の検知と回避旋回の開始
//! 6. **給餌進行**: 餌ノードの姿勢更新と餌粒の沈降
//!
//! ポインタイベント（クリック・移動）は同一スレッド上でフレーム間に
//! 呼び出され、ドラッグ状態と給餌状態のみを変更します。
//!
//! ## 使用例
//!
//! ```rust
//! use aquasim::scenario::AquariumScenario;
//! use aquasim::simulation::AquariumEngine;
//!
//! let scenario = AquariumScenario::demo();
//! let mut engine = AquariumEngine::new(scenario);
//! engine.run().expect("ヘッドレス実行");
//! ```

use crate::models::{
    DecorDef, DecorLoader, DragController, DragEvent, Fish, FeedingSequencer, Obstacle,
    ObstaclePolicy, ObstacleVolume, PickTarget, TankBoundaryPolicy,
    traits::{CorrectionReason, FrameContext, HeadingCorrection, IAgent, ICollisionPolicy},
};
use crate::scenario::AquariumScenario;
use crate::scene::{
    Camera, NodeId, SceneGraph,
    picking::{pointer_to_ndc, raycast},
};
use glam::{Quat, Vec3};
use std::collections::HashMap;
use tracing::{debug, info, trace};

/// 餌箱ノードの半径
const FOOD_HALF_EXTENTS: Vec3 = Vec3::new(1.6, 1.2, 1.6);

/// 砂層の厚み
const SAND_THICKNESS: f32 = 2.0;

/// ノードに紐づくメタデータ
///
/// ドラッグ可否や地面フラグは、ノード本体ではなくノードIDをキーとする
/// 型付きのサイドテーブルで管理します。
#[derive(Debug, Clone, Default)]
pub struct NodeTags {
    pub display_name: String,
    pub draggable: bool,
    pub ground: bool,
}

/// 実行統計
#[derive(Debug, Clone, Copy, Default)]
pub struct SimStats {
    pub frames: u64,
    pub boundary_turns: u64,
    pub obstacle_turns: u64,
    pub feed_triggers: u64,
}

/// 水槽シミュレーションエンジン
///
/// シーングラフ、カメラ、エージェント、各ポリシー、操作状態を所有し、
/// フレームごとの更新とポインタイベントの処理を行います。
pub struct AquariumEngine {
    pub scenario: AquariumScenario,
    pub scene: SceneGraph,
    pub camera: Camera,
    pub fish: Fish,
    pub fish_node: NodeId,
    pub food_node: NodeId,
    pub obstacles: Vec<Obstacle>,
    pub drag: DragController,
    pub feeding: FeedingSequencer,
    pub stats: SimStats,

    boundary_policy: TankBoundaryPolicy,
    obstacle_policy: ObstaclePolicy,
    tags: HashMap<NodeId, NodeTags>,
    decor: Option<DecorLoader>,
    rng: fastrand::Rng,
    viewport: [f32; 2],
    current_time: f32,
}

impl AquariumEngine {
    pub fn new(scenario: AquariumScenario) -> Self {
        let mut scene = SceneGraph::new();
        let mut tags = HashMap::new();

        // 机（水槽の下の家具、操作対象外）
        let desk = scene.create_node("desk");
        scene.set_position(
            desk,
            Vec3::new(0.0, -scenario.tank.height * 0.5 - 0.52, 0.0),
        );
        scene.set_half_extents(desk, Vec3::new(45.0, 0.5, 30.0));
        tags.insert(
            desk,
            NodeTags {
                display_name: "desk".to_string(),
                ..NodeTags::default()
            },
        );

        // 水槽のガラス枠（ボリュームなし、ピッキング対象外）
        let tank_node = scene.create_node("aquarium");
        tags.insert(
            tank_node,
            NodeTags {
                display_name: "aquarium".to_string(),
                ..NodeTags::default()
            },
        );

        // 砂面（ドラッグの地面判定に使う）
        let sand = scene.create_node("sand");
        scene.set_position(
            sand,
            Vec3::new(0.0, scenario.tank.sand_level - SAND_THICKNESS * 0.5, 0.0),
        );
        scene.set_half_extents(
            sand,
            Vec3::new(
                scenario.tank.width * 0.5,
                SAND_THICKNESS * 0.5,
                scenario.tank.depth * 0.5,
            ),
        );
        tags.insert(
            sand,
            NodeTags {
                display_name: "sand".to_string(),
                ground: true,
                ..NodeTags::default()
            },
        );

        // 魚グループ（衝突ボリュームはグループ本体が持ち、
        // 頭・胴・尾の子ノードは見た目用の配置のみ）
        let fish_node = scene.create_node("fish");
        scene.set_half_extents(fish_node, Vec3::from_array(scenario.fish.half_extents));
        for (name, offset) in [
            ("fish_head", Vec3::new(0.0, 0.0, 2.5)),
            ("fish_body", Vec3::new(0.0, 0.0, -0.25)),
            ("fish_tail", Vec3::new(0.0, 0.0, -4.8)),
        ] {
            let part = scene.create_node(name);
            scene.set_position(part, offset);
            scene.attach(fish_node, part);
        }
        tags.insert(
            fish_node,
            NodeTags {
                display_name: "fish".to_string(),
                ..NodeTags::default()
            },
        );

        // 餌箱
        let food_node = scene.create_node("fish_food");
        scene.set_position(food_node, Vec3::from_array(scenario.feeding.dispenser_position));
        scene.set_half_extents(food_node, FOOD_HALF_EXTENTS);
        tags.insert(
            food_node,
            NodeTags {
                display_name: "fish_food".to_string(),
                ..NodeTags::default()
            },
        );

        let mut fish = Fish::new("fish".to_string());
        fish.initialize(&scenario);

        let boundary_policy = TankBoundaryPolicy::from_scenario(&scenario);
        let obstacle_policy = ObstaclePolicy::from_scenario(&scenario);
        let feeding = FeedingSequencer::from_scenario(&scenario);
        let camera = Camera::from_scenario(&scenario);
        let [width, height] = scenario.camera.viewport;
        let rng = fastrand::Rng::with_seed(scenario.sim.seed);

        let mut engine = Self {
            scenario,
            scene,
            camera,
            fish,
            fish_node,
            food_node,
            obstacles: Vec::new(),
            drag: DragController::new(),
            feeding,
            stats: SimStats::default(),
            boundary_policy,
            obstacle_policy,
            tags,
            decor: None,
            rng,
            viewport: [width as f32, height as f32],
            current_time: 0.0,
        };

        // 静的障害物はシーン構築時に追加する
        for config in engine.scenario.obstacles.clone() {
            engine.add_obstacle(
                &config.id,
                Vec3::from_array(config.position),
                Vec3::from_array(config.half_extents),
                config.draggable,
            );
        }

        engine.scene.set_position(engine.fish_node, engine.fish.position);
        engine
            .scene
            .set_rotation(engine.fish_node, engine.fish.orientation());

        info!(
            obstacles = engine.obstacles.len(),
            "ENGINE_READY: 水槽エンジンを初期化しました"
        );
        engine
    }

    /// 装飾ローダの接続
    ///
    /// 以降のフレームで、読み込み済みの装飾障害物が障害物リストへ
    /// 追記されるようになります。
    pub fn set_decor_loader(&mut self, loader: DecorLoader) {
        self.decor = Some(loader);
    }

    /// 障害物の追加（シーンノード生成とタグ登録を含む）
    pub fn add_obstacle(
        &mut self,
        id: &str,
        position: Vec3,
        half_extents: Vec3,
        draggable: bool,
    ) -> NodeId {
        let node = self.scene.create_node(id);
        self.scene.set_position(node, position);
        self.scene.set_half_extents(node, half_extents);
        self.tags.insert(
            node,
            NodeTags {
                display_name: id.to_string(),
                draggable,
                ground: false,
            },
        );
        self.obstacles.push(Obstacle {
            id: id.to_string(),
            node,
            draggable,
        });
        node
    }

    /// 1フレーム分の更新
    ///
    /// # 引数
    ///
    /// * `t` - シミュレーション開始からの経過時刻（秒）
    pub fn update(&mut self, t: f32) {
        self.current_time = t;
        self.absorb_loaded_decor();

        let candidate = self.fish.advance(t);
        let head_point = self.fish.head_point(candidate);
        let obstacle_volumes = self.obstacle_volumes();

        let context = FrameContext {
            time: t,
            candidate,
            head_point,
            fish_aabb: self.fish.world_aabb_at(candidate),
            obstacles: &obstacle_volumes,
        };

        if let Some(correction) =
            self.obstacle_policy.evaluate(&self.fish, &context, &mut self.rng)
        {
            // 候補位置は破棄され、魚はその場で向き直る
            self.apply_correction(&correction, t);
        } else {
            let clamped = self
                .boundary_policy
                .volume
                .clamp_position(candidate, self.fish.world_half_extents());
            self.fish.commit(clamped);
        }

        self.scene.set_position(self.fish_node, self.fish.position);
        self.scene
            .set_rotation(self.fish_node, self.fish.orientation());

        // 境界判定は旋回中を除いて毎フレーム行う。クランプ済みのため
        // 境界面への接触がそのまま違反になる
        if !self.fish.turning {
            if let Some(fish_aabb) = self.scene.world_aabb(self.fish_node) {
                let context = FrameContext {
                    time: t,
                    candidate: self.fish.position,
                    head_point: self.fish.head_point(self.fish.position),
                    fish_aabb,
                    obstacles: &obstacle_volumes,
                };
                if let Some(correction) =
                    self.boundary_policy.evaluate(&self.fish, &context, &mut self.rng)
                {
                    self.apply_correction(&correction, t);
                }
            }
        }

        let pose = self.feeding.tick(t, &mut self.rng);
        self.scene.set_position(self.food_node, pose.position);
        self.scene
            .set_rotation(self.food_node, Quat::from_rotation_z(pose.roll_deg.to_radians()));

        self.stats.frames += 1;
    }

    fn apply_correction(&mut self, correction: &HeadingCorrection, t: f32) {
        self.fish.begin_turn(correction.target_heading, t);
        match &correction.reason {
            CorrectionReason::Obstacle(id) => {
                self.stats.obstacle_turns += 1;
                debug!(
                    obstacle_id = %id,
                    position_x = self.fish.position.x,
                    position_y = self.fish.position.y,
                    position_z = self.fish.position.z,
                    time = t,
                    "FISH_TURN_OBSTACLE: 障害物を回避する旋回を開始しました"
                );
            }
            reason => {
                self.stats.boundary_turns += 1;
                debug!(
                    reason = ?reason,
                    position_x = self.fish.position.x,
                    position_y = self.fish.position.y,
                    position_z = self.fish.position.z,
                    time = t,
                    "FISH_TURN_BOUNDARY: 水槽境界を回避する旋回を開始しました"
                );
            }
        }
    }

    fn obstacle_volumes(&self) -> Vec<ObstacleVolume> {
        self.obstacles
            .iter()
            .filter_map(|obstacle| {
                let aabb = self.scene.world_aabb(obstacle.node)?;
                Some(ObstacleVolume {
                    id: obstacle.id.clone(),
                    aabb,
                })
            })
            .collect()
    }

    fn absorb_loaded_decor(&mut self) {
        let Some(loader) = &mut self.decor else {
            return;
        };
        let loaded: Vec<DecorDef> = loader.poll();
        for def in loaded {
            let node = self.add_obstacle(
                &def.id,
                Vec3::from_array(def.position),
                Vec3::from_array(def.half_extents),
                def.draggable,
            );
            debug!(
                obstacle_id = %def.id,
                node = node.0,
                "OBSTACLE_APPENDED: 装飾障害物を衝突リストへ追加しました"
            );
        }
    }

    /// 給餌シーケンスの起動（餌ノードクリック時、またはホストからの直接要求）
    pub fn trigger_feeding(&mut self) {
        if self.feeding.trigger(self.current_time) {
            self.stats.feed_triggers += 1;
        }
    }

    /// ビューポートサイズの変更
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.viewport = [width as f32, height as f32];
        self.camera.aspect = width as f32 / height as f32;
    }

    /// ポインタのクリック入力
    ///
    /// ドラッグ中ならノードを離します。そうでなければ餌ノードの判定を
    /// 先に行い、ヒットすれば給餌を起動します。どちらでもなければ
    /// ドラッグ対象のピックを試みます。
    ///
    /// # 引数
    ///
    /// * `x`, `y` - ビューポートのピクセル座標
    pub fn on_pointer_click(&mut self, x: f32, y: f32) {
        let ndc = pointer_to_ndc(x, y, self.viewport[0], self.viewport[1]);
        let ray = self.camera.ray_from_ndc(ndc);

        if self.drag.is_dragging() {
            if let DragEvent::Dropped(node) = self.drag.on_pick(None) {
                info!(
                    node = node.0,
                    name = %self.display_name(node),
                    "DRAG_DROP: ノードを離しました"
                );
            }
            return;
        }

        if !raycast(&self.scene, &ray, &[self.food_node], true).is_empty() {
            self.trigger_feeding();
            return;
        }

        let roots = self.scene.roots();
        let hits = raycast(&self.scene, &ray, &roots, true);
        let target = hits.first().and_then(|hit| {
            self.draggable_ancestor(hit.node).map(|node| PickTarget {
                node,
                hit_point: hit.point,
                node_position: self.scene.world_position(node),
            })
        });

        if let DragEvent::Picked(node) = self.drag.on_pick(target) {
            info!(
                node = node.0,
                name = %self.display_name(node),
                "DRAG_PICK: ノードを掴みました"
            );
        }
    }

    /// ポインタの移動入力
    ///
    /// ドラッグ中のみ有効です。地面ノードとの交点へ、記録済みの平面
    /// オフセットを差し引いた位置までノードを運びます。Yは変更しません。
    pub fn on_pointer_move(&mut self, x: f32, y: f32) {
        if !self.drag.is_dragging() {
            return;
        }

        let ndc = pointer_to_ndc(x, y, self.viewport[0], self.viewport[1]);
        let ray = self.camera.ray_from_ndc(ndc);

        let ground_nodes: Vec<NodeId> = self
            .tags
            .iter()
            .filter(|(_, tags)| tags.ground)
            .map(|(node, _)| *node)
            .collect();
        let hits = raycast(&self.scene, &ray, &ground_nodes, false);
        let ground_point = hits.first().map(|hit| hit.point);

        if let Some((node, new_x, new_z)) = self.drag.on_move(ground_point) {
            let mut position = self.scene.node(node).transform.position;
            position.x = new_x;
            position.z = new_z;
            self.scene.set_position(node, position);
            trace!(
                node = node.0,
                x = new_x,
                z = new_z,
                "DRAG_MOVE: ノードを水平移動しました"
            );
        }
    }

    /// カメラのオービット操作が現在有効かどうか
    ///
    /// ドラッグ中のオービット無効化は設定次第の挙動です。
    pub fn orbit_enabled(&self) -> bool {
        !(self.scenario.interaction.orbit_locked_while_dragging && self.drag.is_dragging())
    }

    /// ノードの表示名
    pub fn display_name(&self, node: NodeId) -> String {
        self.tags
            .get(&node)
            .map(|tags| tags.display_name.clone())
            .unwrap_or_else(|| self.scene.node(node).name.clone())
    }

    fn draggable_ancestor(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.tags.get(&id).is_some_and(|tags| tags.draggable) {
                return Some(id);
            }
            current = self.scene.parent(id);
        }
        None
    }

    /// ヘッドレス実行
    ///
    /// 固定時間刻みでシミュレーションを最後まで進めます。シナリオに
    /// `sim.feed_at_s` が指定されていれば、その時刻で給餌を起動します。
    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("=== シミュレーション実行開始 ===");

        let dt = self.scenario.sim.dt_s;
        let t_max = self.scenario.sim.t_max_s;
        let feed_at = self.scenario.sim.feed_at_s;

        let mut t: f32 = 0.0;
        let mut step: u64 = 0;
        let mut fed = false;

        while t < t_max {
            if let Some(feed_time) = feed_at {
                if !fed && t >= feed_time {
                    self.trigger_feeding();
                    fed = true;
                }
            }

            self.update(t);
            t += dt;
            step += 1;

            if step % 600 == 0 {
                let progress = (t / t_max) * 100.0;
                info!(
                    "進行状況: {:.1}% ({:.1}/{:.1}秒)",
                    progress, t, t_max
                );
            }

            if step > 10_000_000 {
                break;
            }
        }

        info!("=== シミュレーション完了 ===");
        info!("総フレーム数: {}", self.stats.frames);
        info!("境界回避旋回: {}回", self.stats.boundary_turns);
        info!("障害物回避旋回: {}回", self.stats.obstacle_turns);
        info!("給餌回数: {}回", self.stats.feed_triggers);
        info!(
            "散布餌粒: {}個 (着底 {}個)",
            self.feeding.pellets_dropped_total, self.feeding.pellets_settled_total
        );

        Ok(())
    }
}
