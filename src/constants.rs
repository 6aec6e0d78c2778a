//! Fixed parameters of the SECAM simulation.

// ────────────────────────────────────────────────────────────────────────────
// Picture geometry
// ────────────────────────────────────────────────────────────────────────────

/// Luma pixels per chroma sample horizontally.
pub const CHROMA_BLOCK_W: usize = 4;
/// Luma lines per chroma sample vertically.
pub const CHROMA_BLOCK_H: usize = 2;

/// Value of every plane in a neutral picture (mid luma, zero chroma).
pub const NEUTRAL: u8 = 128;

// ────────────────────────────────────────────────────────────────────────────
// BT.601 studio-swing conversion (coefficients already scaled by 256)
// ────────────────────────────────────────────────────────────────────────────

pub const Y_OFFSET: f64 = 16.0;
pub const Y_FROM_RGB: [f64; 3] = [65.738, 129.057, 25.064];
pub const CB_FROM_RGB: [f64; 3] = [-37.945, -74.494, 112.439];
pub const CR_FROM_RGB: [f64; 3] = [112.439, -94.154, -18.285];

pub const RGB_FROM_Y: f64 = 298.082;
pub const R_FROM_CR: f64 = 408.583;
pub const G_FROM_CB: f64 = -100.291;
pub const G_FROM_CR: f64 = -208.120;
pub const B_FROM_CB: f64 = 516.412;
pub const R_OFFSET: f64 = -222.921;
pub const G_OFFSET: f64 = 135.576;
pub const B_OFFSET: f64 = -276.836;

// ────────────────────────────────────────────────────────────────────────────
// Color fire scan
// ────────────────────────────────────────────────────────────────────────────

/// Minimal horizontal run (in chroma blocks) between two ignitions.
pub const MIN_STEP: f64 = 12.0;
/// Upper spread of the randomized step, as a multiple of `MIN_STEP`.
pub const STEP_SPREAD: f64 = 10.5;
/// Probability that an ignition lands on Cb rather than Cr.
pub const BLUE_PROBABILITY: f64 = 0.25;
/// Base fire intensity and its random spread.
pub const FIRE_BASE: f64 = 320.0;
pub const FIRE_SPREAD: f64 = 128.0;

// ────────────────────────────────────────────────────────────────────────────
// Value noise
// ────────────────────────────────────────────────────────────────────────────

pub const LATTICE_SIZE: usize = 256;

pub const CHROMA_NOISE_SCALE: f64 = 0.97;
pub const CB_NOISE_ROW_OFFSET: f64 = 16384.0;
pub const CR_NOISE_ROW_OFFSET: f64 = 32768.0;

pub const LUMA_NOISE_SCALE: f64 = 0.192;
pub const LUMA_NOISE_OFFSET: f64 = 8_388_608.0;
pub const LUMA_NOISE_ROW_OFFSET: f64 = 4096.0;
/// Luma noise amplitude relative to the chroma noise amplitude.
pub const LUMA_NOISE_RATIO: f64 = 1.0 / 9.0;

// ────────────────────────────────────────────────────────────────────────────
// Defaults
// ────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_RANDOM_FACTOR: f64 = 0.001;
pub const DEFAULT_THRESHOLD: f64 = 0.024;
pub const DEFAULT_NOISE_AMPLITUDE: f64 = 36.0;

/// Line count of the working picture when 480p is forced.
pub const FORCED_HEIGHT: usize = 480;

/// JPEG encoder quality.
pub const JPEG_QUALITY: u8 = 100;
