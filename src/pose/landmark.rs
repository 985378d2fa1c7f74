use crate::error::DetectionError;

/// MediaPipe Pose の 33 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    /// インデックス順の全ランドマーク
    pub const ALL: [LandmarkIndex; LandmarkIndex::COUNT] = {
        use LandmarkIndex::*;
        [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye, RightEyeOuter,
            LeftEar, RightEar, MouthLeft, MouthRight,
            LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftWrist, RightWrist,
            LeftPinky, RightPinky, LeftIndex, RightIndex, LeftThumb, RightThumb,
            LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle,
            LeftHeel, RightHeel, LeftFootIndex, RightFootIndex,
        ]
    };
}

/// 3次元座標
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// 2点の中点
    pub fn midpoint(a: Point3, b: Point3) -> Self {
        Self {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
            z: (a.z + b.z) / 2.0,
        }
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0, 画面幅基準)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0, 画面高さ基準, 下が正)
    pub y: f32,
    /// 腰中心を原点とする相対深度
    pub z: f32,
    /// 可視性スコア (0.0〜1.0)
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// 可視性が下限を上回っているか
    pub fn is_visible(&self, min_visibility: f32) -> bool {
        self.visibility > min_visibility
    }

    pub fn position(&self) -> Point3 {
        Point3::new(self.x, self.y, self.z)
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// 1フレーム分のランドマーク
#[derive(Debug, Clone)]
pub struct LandmarkFrame {
    pub landmarks: [Landmark; LandmarkIndex::COUNT],
    /// 取得時刻（秒, 単調増加クロック）
    pub timestamp: f64,
}

impl LandmarkFrame {
    pub fn new(landmarks: [Landmark; LandmarkIndex::COUNT], timestamp: f64) -> Self {
        Self { landmarks, timestamp }
    }

    /// 可変長スライスから作成（個数が33でなければエラー）
    pub fn from_slice(landmarks: &[Landmark], timestamp: f64) -> Result<Self, DetectionError> {
        let landmarks: [Landmark; LandmarkIndex::COUNT] =
            landmarks
                .try_into()
                .map_err(|_| DetectionError::LandmarkCount {
                    expected: LandmarkIndex::COUNT,
                    actual: landmarks.len(),
                })?;
        Ok(Self::new(landmarks, timestamp))
    }

    /// インデックスでランドマークを取得
    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.landmarks[index as usize]
    }
}
