//! Protocol constants
//!
//! Camera geometry matches the NIR camera on the capture server; the gallery
//! layout matches the four-slot image wall every headset renders.

/// Native NIR camera width in pixels
pub const CAMERA_WIDTH: usize = 648;

/// Native NIR camera height in pixels
pub const CAMERA_HEIGHT: usize = 488;

/// Downsampling factor applied by the capture server before streaming
pub const DOWNSAMPLE_FACTOR: usize = 2;

/// Bytes per pixel of the streamed format (16-bit)
pub const BYTES_PER_PIXEL: usize = 2;

/// Streamed frame width after downsampling
pub const FRAME_WIDTH: usize = CAMERA_WIDTH / DOWNSAMPLE_FACTOR;

/// Streamed frame height after downsampling
pub const FRAME_HEIGHT: usize = CAMERA_HEIGHT / DOWNSAMPLE_FACTOR;

/// Exact byte length of one streamed camera frame
pub const FRAME_LEN: usize = FRAME_WIDTH * FRAME_HEIGHT * BYTES_PER_PIXEL;

/// Number of gallery slots shown per page
pub const ITEMS_PER_PAGE: u32 = 4;

/// Expanded-item sentinel: no slot is expanded, gallery visible
pub const EXPANDED_NONE: i32 = -1;

/// Expanded-item sentinel: gallery hidden from the user
pub const EXPANDED_HIDDEN: i32 = -2;
