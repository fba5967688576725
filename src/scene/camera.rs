use crate::scenario::AquariumScenario;
use crate::scene::picking::Ray;
use glam::{Mat4, Vec2, Vec3};

/// 透視投影カメラ
///
/// 注視点方式の右手系カメラです。正規化デバイス座標（NDC）からの
/// ピッキングレイ生成に使います。深度範囲は[0, 1]です。
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    /// 視点位置
    pub eye: Vec3,
    /// 注視点
    pub target: Vec3,
    /// 上方向
    pub up: Vec3,
    /// 垂直視野角（度）
    pub fov_y_deg: f32,
    /// アスペクト比（幅/高さ）
    pub aspect: f32,
    /// 近クリップ面
    pub near: f32,
    /// 遠クリップ面
    pub far: f32,
}

impl Camera {
    pub fn from_scenario(scenario: &AquariumScenario) -> Self {
        let cfg = &scenario.camera;
        let [width, height] = cfg.viewport;
        Self {
            eye: Vec3::from_array(cfg.eye),
            target: Vec3::from_array(cfg.target),
            up: Vec3::Y,
            fov_y_deg: cfg.fov_y_deg,
            aspect: width as f32 / height as f32,
            near: cfg.near,
            far: cfg.far,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.near, self.far)
    }

    /// NDC座標からピッキングレイを生成
    ///
    /// NDCの近平面上の点と遠平面上の点を逆射影し、その2点を通る
    /// レイを作ります。
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let inverse = (self.projection_matrix() * self.view_matrix()).inverse();
        let near_point = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far_point = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray::new(near_point, far_point - near_point)
    }
}
