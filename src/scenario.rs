use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub dt_s: f32,
    pub t_max_s: f32,
    pub seed: u64,
    /// ヘッドレス実行中に給餌を起動する時刻（省略可）
    pub feed_at_s: Option<f32>,
}

/// 水槽設定
///
/// 水槽は原点中心の軸平行直方体です。`sand_level` は砂面の高さ（Y）で、
/// 魚が遊泳できる領域の下限になります。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TankConfig {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub sand_level: f32,
}

/// 魚エージェント設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FishConfig {
    pub speed: f32,
    pub turn_duration_s: f32,
    pub initial_position: [f32; 3],
    pub initial_heading: [f32; 3],
    pub head_offset: [f32; 3],
    pub half_extents: [f32; 3],
}

/// 操舵設定
///
/// 境界・障害物との衝突時に生成する回避方位の乱数パラメータです。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SteeringConfig {
    /// 側面違反時の旋回角範囲（度）
    pub side_turn_deg: [f32; 2],
    /// 側面違反時の鉛直ゆらぎ幅
    pub side_vertical_jitter: f32,
    /// 上下違反時の回転角範囲（度、±）
    pub vertical_turn_deg: f32,
    /// 上下違反時に強制する鉛直成分
    pub vertical_kick: f32,
    /// 障害物反射時のヨー摂動範囲（度、±）
    pub obstacle_turn_deg: f32,
}

/// 給餌設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedingConfig {
    pub dispenser_position: [f32; 3],
    pub rise: f32,
    pub slide: f32,
    pub tilt_deg: f32,
    pub pellet_count: u32,
    pub pellet_scatter: f32,
    pub pellet_fall_step: f32,
    pub pellet_floor: f32,
}

/// カメラ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    pub eye: [f32; 3],
    pub target: [f32; 3],
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    /// ビューポートの初期サイズ（幅, 高さ）
    pub viewport: [u32; 2],
}

/// 操作設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InteractionConfig {
    /// ドラッグ中にカメラのオービット操作を無効化するか
    pub orbit_locked_while_dragging: bool,
}

/// 静的障害物設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObstacleConfig {
    pub id: String,
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
    pub draggable: bool,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AquariumScenario {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    pub tank: TankConfig,
    pub fish: FishConfig,
    pub steering: SteeringConfig,
    pub feeding: FeedingConfig,
    pub camera: CameraConfig,
    pub interaction: InteractionConfig,
    pub obstacles: Vec<ObstacleConfig>,
    /// 非同期読み込みする装飾ファイルのパス（省略可）
    pub decor_file: Option<String>,
}

impl AquariumScenario {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        let scenario: AquariumScenario = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        scenario.validate()?;

        Ok(scenario)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.sim.dt_s <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "sim.dt_s must be positive".to_string(),
            ));
        }
        if self.sim.t_max_s <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "sim.t_max_s must be positive".to_string(),
            ));
        }

        if self.tank.width <= 0.0 || self.tank.height <= 0.0 || self.tank.depth <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "tank dimensions must be positive".to_string(),
            ));
        }
        let top = self.tank.height * 0.5;
        if self.tank.sand_level <= -top || self.tank.sand_level >= top {
            return Err(ScenarioError::ValidationError(
                "tank.sand_level must lie strictly inside the tank height".to_string(),
            ));
        }

        if self.fish.speed <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "fish.speed must be positive".to_string(),
            ));
        }
        if self.fish.turn_duration_s <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "fish.turn_duration_s must be positive".to_string(),
            ));
        }
        let heading = self.fish.initial_heading;
        let heading_sq: f32 = heading.iter().map(|c| c * c).sum();
        if heading_sq < 1e-9 {
            return Err(ScenarioError::ValidationError(
                "fish.initial_heading must be non-zero".to_string(),
            ));
        }

        // 魚が水槽へ物理的に収まることを保証する（クランプの前提条件）
        let half = self.fish.half_extents;
        let swim_height = top - self.tank.sand_level;
        if half[0] * 2.0 >= self.tank.width
            || half[1] * 2.0 >= swim_height
            || half[2] * 2.0 >= self.tank.depth
        {
            return Err(ScenarioError::ValidationError(
                "fish.half_extents do not fit inside the tank".to_string(),
            ));
        }

        let [lo, hi] = self.steering.side_turn_deg;
        if lo < 0.0 || hi < lo {
            return Err(ScenarioError::ValidationError(
                "steering.side_turn_deg must satisfy 0 <= min <= max".to_string(),
            ));
        }

        if self.feeding.pellet_count == 0 {
            return Err(ScenarioError::ValidationError(
                "feeding.pellet_count must be at least 1".to_string(),
            ));
        }
        if self.feeding.pellet_fall_step <= 0.0 {
            return Err(ScenarioError::ValidationError(
                "feeding.pellet_fall_step must be positive".to_string(),
            ));
        }

        let [width, height] = self.camera.viewport;
        if width == 0 || height == 0 {
            return Err(ScenarioError::ValidationError(
                "camera.viewport must be non-zero".to_string(),
            ));
        }

        if let Some(feed_at) = self.sim.feed_at_s {
            if feed_at < 0.0 || feed_at >= self.sim.t_max_s {
                return Err(ScenarioError::ValidationError(
                    "sim.feed_at_s must lie within the simulation time".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// シナリオの概要をログ出力
    pub fn log_summary(&self) {
        info!("=== シナリオ情報 ===");
        info!("名前: {}", self.meta.name);
        info!("説明: {}", self.meta.description);
        info!("バージョン: {}", self.meta.version);
        info!(
            "水槽: {:.0} x {:.0} x {:.0} (砂面: {:.1})",
            self.tank.width, self.tank.height, self.tank.depth, self.tank.sand_level
        );
        info!(
            "魚: 速度 {:.1}/秒, 旋回 {:.2}秒",
            self.fish.speed, self.fish.turn_duration_s
        );
        info!("静的障害物: {}個", self.obstacles.len());
        if let Some(decor) = &self.decor_file {
            info!("装飾ファイル: {}", decor);
        }
        info!(
            "時間刻み: {:.4}秒, 最大時間: {:.1}秒, シード値: {}",
            self.sim.dt_s, self.sim.t_max_s, self.sim.seed
        );
    }

    /// 組み込みのデモシナリオ
    ///
    /// テストと自己診断モードで使う、ファイル読み込み不要の標準水槽です。
    pub fn demo() -> Self {
        Self {
            meta: ScenarioMeta {
                version: "1.0".to_string(),
                name: "demo".to_string(),
                description: "組み込みデモ水槽".to_string(),
            },
            sim: SimulationConfig {
                dt_s: 1.0 / 60.0,
                t_max_s: 60.0,
                seed: 7,
                feed_at_s: None,
            },
            tank: TankConfig {
                width: 60.0,
                height: 36.0,
                depth: 48.0,
                sand_level: -16.0,
            },
            fish: FishConfig {
                speed: 4.0,
                turn_duration_s: 0.5,
                initial_position: [0.0, -1.0, 0.0],
                initial_heading: [0.0, 0.0, 1.0],
                head_offset: [0.0, 0.0, 3.7],
                half_extents: [1.8, 1.5, 5.2],
            },
            steering: SteeringConfig {
                side_turn_deg: [60.0, 120.0],
                side_vertical_jitter: 0.25,
                vertical_turn_deg: 15.0,
                vertical_kick: 0.3,
                obstacle_turn_deg: 15.0,
            },
            feeding: FeedingConfig {
                dispenser_position: [34.0, -6.0, 0.0],
                rise: 42.0,
                slide: -34.0,
                tilt_deg: 45.0,
                pellet_count: 12,
                pellet_scatter: 1.5,
                pellet_fall_step: 1.0,
                pellet_floor: -16.0,
            },
            camera: CameraConfig {
                eye: [0.0, 5.0, 95.0],
                target: [0.0, 0.0, 0.0],
                fov_y_deg: 35.0,
                near: 0.1,
                far: 1000.0,
                viewport: [1280, 720],
            },
            interaction: InteractionConfig {
                orbit_locked_while_dragging: false,
            },
            obstacles: vec![
                ObstacleConfig {
                    id: "rock_a".to_string(),
                    position: [-14.0, -13.0, -8.0],
                    half_extents: [4.0, 3.0, 4.0],
                    draggable: true,
                },
                ObstacleConfig {
                    id: "rock_b".to_string(),
                    position: [12.0, -13.5, 10.0],
                    half_extents: [3.0, 2.5, 3.0],
                    draggable: true,
                },
                ObstacleConfig {
                    id: "shell".to_string(),
                    position: [4.0, -15.0, -16.0],
                    half_extents: [1.5, 1.0, 1.5],
                    draggable: true,
                },
            ],
            decor_file: None,
        }
    }
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}
