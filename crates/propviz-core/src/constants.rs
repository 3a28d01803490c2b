//! Client constants and tuning parameters.

// --- Scene ---

/// Scene width used when the backend omits it (km).
pub const DEFAULT_SCENE_WIDTH_KM: f64 = 100.0;

/// Scene height used when the backend omits it (km).
pub const DEFAULT_SCENE_HEIGHT_KM: f64 = 60.0;

/// Spacing of the background grid lines (km).
pub const GRID_STEP_KM: f64 = 5.0;

// --- Coordinate transform ---

/// Margin left around the scene when fitting the scale (px).
pub const FIT_MARGIN_PX: f64 = 20.0;

/// Smallest usable viewport extent after margins (px).
pub const MIN_VIEWPORT_PX: f64 = 100.0;

/// Web-Mercator tile size (px).
pub const TILE_SIZE_PX: f64 = 256.0;

/// Latitude limit of the Web-Mercator projection (degrees).
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

// --- Geodesy ---

/// Mean Earth radius (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Glyphs are authored pointing East; bearings are rebased by this offset (degrees).
pub const GLYPH_BEARING_OFFSET_DEG: f64 = 90.0;

// --- Heatmap ---

/// Weakest level that still contributes opacity (dBm).
pub const HEAT_LEVEL_FLOOR_DBM: f64 = -130.0;

/// Level at which a sample reaches full opacity (dBm).
pub const HEAT_LEVEL_CEIL_DBM: f64 = -60.0;

/// Perceptual compression exponent for level-to-alpha.
pub const HEAT_GAMMA: f64 = 0.9;

/// Default stamp radius (px).
pub const HEAT_RADIUS_PX: u32 = 26;

/// Default opacity ceiling applied to every stamp.
pub const HEAT_MAX_ALPHA: f64 = 0.65;

/// Default heatmap request radius around the center (km).
pub const HEAT_REQUEST_RADIUS_KM: f64 = 3.0;

/// Default heatmap sample spacing (m).
pub const HEAT_REQUEST_STEP_M: u32 = 200;

/// Default receiver frequency for heatmap and LOS requests (MHz).
pub const DEFAULT_RX_FREQUENCY_MHZ: f64 = 118.1;

/// Default receiver filter window (kHz).
pub const DEFAULT_WINDOW_KHZ: f64 = 150.0;

// --- Interference ---

/// Default receiver window for interference analysis (kHz).
pub const INTERFERENCE_WINDOW_KHZ: f64 = 500.0;

/// Default highest intermodulation order requested.
pub const INTERFERENCE_MAX_ORDER: u32 = 3;

/// Intermodulation orders accepted by the backend.
pub const INTERFERENCE_MIN_ORDER: u32 = 2;
pub const INTERFERENCE_MAX_ORDER_LIMIT: u32 = 5;

/// Rows kept per interference table.
pub const INTERFERENCE_TABLE_ROWS: usize = 60;

// --- Playback ---

/// Playback tick period (ms).
pub const PLAYBACK_PERIOD_MS: u64 = 600;

/// Lower bound applied to the operator's speed before rounding.
pub const PLAYBACK_MIN_SPEED: f64 = 0.5;

/// Entity id preferred as the moving entity.
pub const DEFAULT_MOVING_ENTITY_ID: &str = "av1";

// --- Line-of-sight profile view ---

pub const PROFILE_WIDTH_PX: f64 = 800.0;
pub const PROFILE_HEIGHT_PX: f64 = 240.0;
pub const PROFILE_PAD_LEFT_PX: f64 = 40.0;
pub const PROFILE_PAD_RIGHT_PX: f64 = 10.0;
pub const PROFILE_PAD_TOP_PX: f64 = 10.0;
pub const PROFILE_PAD_BOTTOM_PX: f64 = 30.0;

/// Keeps the vertical scale finite for a flat profile.
pub const PROFILE_RANGE_EPSILON: f64 = 1e-6;

/// Samples requested along a LOS path.
pub const PROFILE_SAMPLES: u32 = 128;

/// Default effective Earth radius factor sent with LOS requests.
pub const DEFAULT_K_FACTOR: f64 = 1.33;

// --- Event loop ---

/// Frame interval of the event loop when idle (ms).
pub const FRAME_INTERVAL_MS: u64 = 16;

/// Notices kept in a snapshot.
pub const MAX_NOTICES: usize = 32;
