//! Vertical reflow and canvas extent.

use crate::config::CanvasConfig;
use crate::elements::Element;
use std::sync::Arc;

/// Stack every element after `index` directly below its predecessor with
/// `spacing` between them. Returns how many elements moved.
///
/// Untouched elements keep sharing their `Arc` with older snapshots.
pub fn cascade_from(elements: &mut [Arc<Element>], index: usize, spacing: f64) -> usize {
    let mut moved = 0;
    for next in index + 1..elements.len() {
        let target = elements[next - 1].bottom() + spacing;
        if elements[next].origin.y != target {
            Arc::make_mut(&mut elements[next]).origin.y = target;
            moved += 1;
        }
    }
    moved
}

/// Height needed to show every element plus the buffer, never below the
/// configured minimum.
pub fn canvas_height(elements: &[Arc<Element>], config: &CanvasConfig) -> f64 {
    let lowest = elements.iter().map(|e| e.bottom()).fold(0.0, f64::max);
    (lowest + config.buffer_space).max(config.minimum_height)
}
