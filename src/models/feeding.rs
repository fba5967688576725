use crate::scenario::AquariumScenario;
use glam::Vec3;
use tracing::{debug, info};

/// 給餌シーケンスのフェーズ
///
/// トリガーからの経過秒数だけで決まる時限フェーズです。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedPhase {
    /// 待機中
    Idle,
    /// 上昇（0.0〜0.5秒）
    Rise,
    /// 水槽上空への水平移動（0.5〜1.5秒）
    SlideOut,
    /// 前方軸まわりの傾き 0度→45度（1.5〜2.0秒）
    TiltDown,
    /// 傾き戻し 45度→0度、進入時に餌粒を散布（2.0〜2.5秒）
    TiltBack,
    /// 水平位置の復帰（2.5〜3.5秒）
    SlideBack,
    /// 高さの復帰（3.5〜4.0秒）
    Descend,
}

/// フェーズ境界（秒）
const RISE_END: f32 = 0.5;
const SLIDE_OUT_END: f32 = 1.5;
const TILT_DOWN_END: f32 = 2.0;
const TILT_BACK_END: f32 = 2.5;
const SLIDE_BACK_END: f32 = 3.5;
const SEQUENCE_END: f32 = 4.0;

/// 落下中の餌粒
#[derive(Debug, Clone, Copy)]
pub struct Pellet {
    /// 現在位置（ワールド座標）
    pub position: Vec3,
}

/// 餌ノードの目標姿勢
///
/// エンジンがそのままシーンノードへ書き込みます。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodPose {
    /// 位置（ワールド座標）
    pub position: Vec3,
    /// 前方軸まわりの傾き（度）
    pub roll_deg: f32,
}

/// 給餌シーケンサ
///
/// 餌ノードのクリックで起動する時限アニメーションです。餌箱が持ち上がり、
/// 水槽上空へ移動して傾き、餌粒を散布してから元の姿勢へ戻ります。
/// 起動中の再トリガーは何もしません（トリガー時刻は変化しません）。
///
/// 餌粒は毎フレーム一定量ずつ沈降し、床しきい値を下回った時点で
/// 取り除かれます。
#[derive(Debug, Clone)]
pub struct FeedingSequencer {
    /// シーケンスが起動中かどうか
    pub active: bool,
    /// トリガー時刻（秒）
    pub trigger_time: f32,
    /// このシーケンスで既に餌粒を散布したかどうか
    pub pellets_dropped: bool,
    /// 落下中の餌粒
    pub pellets: Vec<Pellet>,

    /// 餌ノードの定位置
    home: Vec3,
    /// 上昇量
    rise: f32,
    /// 水平移動量（X方向、符号付き）
    slide: f32,
    /// 傾きの最大角（度）
    tilt_deg: f32,
    /// 1回の散布で生成する餌粒数
    pellet_count: u32,
    /// 散布位置の乱数幅
    pellet_scatter: f32,
    /// 1フレームあたりの沈降量
    pellet_fall_step: f32,
    /// 餌粒を取り除く床しきい値（Y）
    pellet_floor: f32,

    /// 統計: 散布した餌粒の累計
    pub pellets_dropped_total: u64,
    /// 統計: 床に達して取り除かれた餌粒の累計
    pub pellets_settled_total: u64,
}

impl FeedingSequencer {
    pub fn from_scenario(scenario: &AquariumScenario) -> Self {
        let cfg = &scenario.feeding;
        Self {
            active: false,
            trigger_time: 0.0,
            pellets_dropped: false,
            pellets: Vec::new(),
            home: Vec3::from_array(cfg.dispenser_position),
            rise: cfg.rise,
            slide: cfg.slide,
            tilt_deg: cfg.tilt_deg,
            pellet_count: cfg.pellet_count,
            pellet_scatter: cfg.pellet_scatter,
            pellet_fall_step: cfg.pellet_fall_step,
            pellet_floor: cfg.pellet_floor,
            pellets_dropped_total: 0,
            pellets_settled_total: 0,
        }
    }

    /// シーケンスの起動
    ///
    /// 起動に成功した場合はtrue、既に起動中で何もしなかった場合はfalseを
    /// 返します。
    pub fn trigger(&mut self, t: f32) -> bool {
        if self.active {
            debug!(
                trigger_time = self.trigger_time,
                attempted_at = t,
                "FEED_RETRIGGER_IGNORED: 給餌シーケンスは既に起動中です"
            );
            return false;
        }

        self.active = true;
        self.trigger_time = t;
        self.pellets_dropped = false;
        info!(time = t, "FEED_TRIGGERED: 給餌シーケンスを開始しました");
        true
    }

    /// 経過秒数に対応するフェーズ
    pub fn phase_at(&self, t: f32) -> FeedPhase {
        if !self.active {
            return FeedPhase::Idle;
        }
        let elapsed = t - self.trigger_time;
        match elapsed {
            e if e < RISE_END => FeedPhase::Rise,
            e if e < SLIDE_OUT_END => FeedPhase::SlideOut,
            e if e < TILT_DOWN_END => FeedPhase::TiltDown,
            e if e < TILT_BACK_END => FeedPhase::TiltBack,
            e if e < SLIDE_BACK_END => FeedPhase::SlideBack,
            e if e < SEQUENCE_END => FeedPhase::Descend,
            _ => FeedPhase::Idle,
        }
    }

    /// 1フレーム分の進行
    ///
    /// 餌ノードの目標姿勢を返し、餌粒を1ステップ沈降させます。
    /// シーケンス終了時刻に達すると待機状態へ戻り、次のトリガーを
    /// 受け付けます。
    pub fn tick(&mut self, t: f32, rng: &mut fastrand::Rng) -> FoodPose {
        let pose = self.advance_sequence(t, rng);
        self.settle_pellets();
        pose
    }

    fn advance_sequence(&mut self, t: f32, rng: &mut fastrand::Rng) -> FoodPose {
        let home_pose = FoodPose {
            position: self.home,
            roll_deg: 0.0,
        };

        if !self.active {
            return home_pose;
        }

        let elapsed = t - self.trigger_time;
        if elapsed >= SEQUENCE_END {
            self.active = false;
            self.pellets_dropped = false;
            info!(
                trigger_time = self.trigger_time,
                "FEED_COMPLETE: 給餌シーケンスが完了しました"
            );
            return home_pose;
        }

        let mut offset_x = 0.0;
        let mut offset_y = 0.0;
        let mut roll = 0.0;

        if elapsed < RISE_END {
            offset_y = self.rise * (elapsed / RISE_END);
        } else if elapsed < SLIDE_OUT_END {
            offset_y = self.rise;
            offset_x = self.slide * ((elapsed - RISE_END) / (SLIDE_OUT_END - RISE_END));
        } else if elapsed < TILT_DOWN_END {
            offset_y = self.rise;
            offset_x = self.slide;
            roll = self.tilt_deg * ((elapsed - SLIDE_OUT_END) / (TILT_DOWN_END - SLIDE_OUT_END));
        } else if elapsed < TILT_BACK_END {
            offset_y = self.rise;
            offset_x = self.slide;
            roll = self.tilt_deg
                * (1.0 - (elapsed - TILT_DOWN_END) / (TILT_BACK_END - TILT_DOWN_END));
            if !self.pellets_dropped {
                let origin = self.home + Vec3::new(offset_x, offset_y, 0.0);
                self.drop_pellets(origin, rng);
            }
        } else if elapsed < SLIDE_BACK_END {
            offset_y = self.rise;
            offset_x = self.slide
                * (1.0 - (elapsed - TILT_BACK_END) / (SLIDE_BACK_END - TILT_BACK_END));
        } else {
            offset_y = self.rise * (1.0 - (elapsed - SLIDE_BACK_END) / (SEQUENCE_END - SLIDE_BACK_END));
        }

        FoodPose {
            position: self.home + Vec3::new(offset_x, offset_y, 0.0),
            roll_deg: roll,
        }
    }

    fn drop_pellets(&mut self, origin: Vec3, rng: &mut fastrand::Rng) {
        for _ in 0..self.pellet_count {
            let scatter = Vec3::new(
                (rng.f32() * 2.0 - 1.0) * self.pellet_scatter,
                rng.f32() * self.pellet_scatter,
                (rng.f32() * 2.0 - 1.0) * self.pellet_scatter,
            );
            self.pellets.push(Pellet {
                position: origin + scatter,
            });
        }
        self.pellets_dropped = true;
        self.pellets_dropped_total += self.pellet_count as u64;
        info!(
            count = self.pellet_count,
            origin_x = origin.x,
            origin_y = origin.y,
            origin_z = origin.z,
            "FEED_PELLETS_DROPPED: 餌粒を散布しました"
        );
    }

    fn settle_pellets(&mut self) {
        let fall = self.pellet_fall_step;
        let floor = self.pellet_floor;
        let before = self.pellets.len();
        for pellet in &mut self.pellets {
            pellet.position.y -= fall;
        }
        self.pellets.retain(|pellet| pellet.position.y >= floor);
        self.pellets_settled_total += (before - self.pellets.len()) as u64;
    }
}
