//! Zero-mean normalized cross-correlation (ZNCC) template matching.
//!
//! For every placement of the template inside the image the score is
//!
//! ```text
//!            sum (T - mean T) * (I - mean I)
//! score = -------------------------------------
//!         sqrt(sum (T - mean T)^2 * sum (I - mean I)^2)
//! ```
//!
//! with means taken per channel and all sums running over every channel of
//! the window.  Scores lie in `[-1, 1]`; an exact copy of the template
//! scores `1.0`.
//!
//! A window (or template) with zero variance has no defined correlation.
//! Such placements score `1.0` when both template and window are flat with
//! identical per-channel values, and `0.0` otherwise.
//!
//! Rows of the score map are computed in parallel with Rayon.

use std::time::Instant;

use image::{ImageBuffer, Luma, Pixel};
use rayon::prelude::*;
use serde::Serialize;

use crate::errors::LocateError;
use crate::reference::Pixels;

/// Largest channel count accepted by the kernel (RGBA).
const MAX_CHANNELS: usize = 4;

/// One ZNCC score per template placement; size is
/// `(image_w - tpl_w + 1) x (image_h - tpl_h + 1)`.
pub type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Best placement in a [`ScoreMap`]: top-left corner and its score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

// ---------------------------------------------------------------------------
// Template statistics
// ---------------------------------------------------------------------------

/// Mean-subtracted template plus what the scan needs to normalise.
struct TemplatePlan {
    /// Interleaved `T - mean T`, same layout as the template bytes.
    t_prime: Vec<f64>,
    /// Per-channel raw sums (used for the flat-vs-flat comparison).
    sums: [u64; MAX_CHANNELS],
    /// `sum (T - mean T)^2` over all channels.
    var: f64,
    flat: bool,
}

impl TemplatePlan {
    fn new(tpl: &[u8], channels: usize) -> Self {
        let n = (tpl.len() / channels) as u64;
        let mut sums = [0u64; MAX_CHANNELS];
        let mut sums2 = [0u64; MAX_CHANNELS];
        for px in tpl.chunks_exact(channels) {
            for (c, &v) in px.iter().enumerate() {
                sums[c] += v as u64;
                sums2[c] += v as u64 * v as u64;
            }
        }

        let means: Vec<f64> = sums[..channels]
            .iter()
            .map(|&s| s as f64 / n as f64)
            .collect();
        let t_prime = tpl
            .chunks_exact(channels)
            .flat_map(|px| px.iter().zip(&means).map(|(&v, &m)| v as f64 - m))
            .collect();

        let (var, flat) = centred_variance(&sums[..channels], &sums2[..channels], n);
        Self {
            t_prime,
            sums,
            var,
            flat,
        }
    }
}

/// `sum (v - mean)^2` across channels from raw sums, and whether every
/// channel is exactly constant.  Exact integer arithmetic decides flatness.
fn centred_variance(sums: &[u64], sums2: &[u64], n: u64) -> (f64, bool) {
    let mut scaled = 0u128;
    for (&s, &s2) in sums.iter().zip(sums2) {
        scaled += n as u128 * s2 as u128 - s as u128 * s as u128;
    }
    (scaled as f64 / n as f64, scaled == 0)
}

// ---------------------------------------------------------------------------
// Kernel
// ---------------------------------------------------------------------------

struct Geometry {
    image_width: usize,
    tpl_width: usize,
    tpl_height: usize,
    channels: usize,
}

fn score_at(image: &[u8], plan: &TemplatePlan, geo: &Geometry, x: usize, y: usize) -> f32 {
    let c = geo.channels;
    let row_len = geo.tpl_width * c;
    let mut dot = 0.0f64;
    let mut sums = [0u64; MAX_CHANNELS];
    let mut sums2 = [0u64; MAX_CHANNELS];

    for ty in 0..geo.tpl_height {
        let start = ((y + ty) * geo.image_width + x) * c;
        let img_row = &image[start..start + row_len];
        let tpl_row = &plan.t_prime[ty * row_len..(ty + 1) * row_len];
        for (px, tp) in img_row.chunks_exact(c).zip(tpl_row.chunks_exact(c)) {
            for ch in 0..c {
                let v = px[ch] as u64;
                dot += tp[ch] * v as f64;
                sums[ch] += v;
                sums2[ch] += v * v;
            }
        }
    }

    let n = (geo.tpl_width * geo.tpl_height) as u64;
    let (var_i, window_flat) = centred_variance(&sums[..c], &sums2[..c], n);

    if plan.flat || window_flat {
        let same = plan.flat && window_flat && sums[..c] == plan.sums[..c];
        return if same { 1.0 } else { 0.0 };
    }

    let score = dot / (plan.var * var_i).sqrt();
    if score.is_finite() {
        score.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}

/// Slide `template` over `image` and score every placement with ZNCC.
///
/// Both buffers must share a pixel type, so channel counts always agree.
///
/// # Errors
///
/// Returns [`LocateError::Matching`] if the template is empty, larger than
/// the image in either axis, or has more than four channels.
pub fn match_template<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    template: &ImageBuffer<P, Vec<u8>>,
) -> Result<ScoreMap, LocateError>
where
    P: Pixel<Subpixel = u8>,
{
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    let channels = P::CHANNEL_COUNT as usize;

    if tw == 0 || th == 0 {
        return Err(LocateError::Matching(format!("empty template ({tw}x{th})")));
    }
    if tw > iw || th > ih {
        return Err(LocateError::Matching(format!(
            "template {tw}x{th} does not fit in image {iw}x{ih}"
        )));
    }
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(LocateError::Matching(format!(
            "unsupported channel count {channels}"
        )));
    }

    let plan = TemplatePlan::new(template.as_raw(), channels);
    let geo = Geometry {
        image_width: iw as usize,
        tpl_width: tw as usize,
        tpl_height: th as usize,
        channels,
    };
    let out_w = (iw - tw + 1) as usize;
    let out_h = (ih - th + 1) as usize;
    let pixels: &[u8] = image.as_raw();

    let started = Instant::now();
    let mut scores = vec![0.0f32; out_w * out_h];
    scores
        .par_chunks_mut(out_w)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, slot) in row.iter_mut().enumerate() {
                *slot = score_at(pixels, &plan, &geo, x, y);
            }
        });
    log::debug!(
        "ZNCC {tw}x{th}x{channels} over {iw}x{ih}: {out_w}x{out_h} placements in {:?}",
        started.elapsed()
    );

    ScoreMap::from_raw(out_w as u32, out_h as u32, scores).ok_or_else(|| {
        LocateError::Matching(format!("score buffer does not fit {out_w}x{out_h}"))
    })
}

/// Highest score in `scores`.
///
/// Ties resolve to the first maximum in row-major order (smallest `y`,
/// then smallest `x`).  Returns `None` only for an empty map.
pub fn best_match(scores: &ScoreMap) -> Option<Peak> {
    let mut best: Option<Peak> = None;
    for (x, y, px) in scores.enumerate_pixels() {
        let score = px[0];
        if best.map_or(true, |b| score > b.score) {
            best = Some(Peak { x, y, score });
        }
    }
    best
}

/// Match `needle` against `haystack` and return the best placement.
///
/// # Errors
///
/// Returns [`LocateError::Matching`] if the two use different colour modes
/// or if [`match_template`] rejects them.
pub fn find_in(haystack: &Pixels, needle: &Pixels) -> Result<Peak, LocateError> {
    let scores = match (haystack, needle) {
        (Pixels::Gray(image), Pixels::Gray(tpl)) => match_template(image, tpl)?,
        (Pixels::Color(image), Pixels::Color(tpl)) => match_template(image, tpl)?,
        _ => {
            return Err(LocateError::Matching(format!(
                "colour mode mismatch: image is {:?}, template is {:?}",
                haystack.mode(),
                needle.mode()
            )))
        }
    };
    best_match(&scores).ok_or_else(|| LocateError::Matching("empty score map".into()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
