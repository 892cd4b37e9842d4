use crate::error::ScopeError;

/// Trailing sub-range of a preprocessed window falling inside the visible
/// span, with x positions relative to the span's left edge.
#[derive(Clone, Debug, Default)]
pub struct VisibleSlice {
    pub x: Vec<f64>,
    pub values: Vec<f32>,
    /// Absolute timestamp of the left edge (`t_last - display_seconds`).
    pub t0: f64,
}

impl VisibleSlice {
    /// Select all entries whose timestamp lies within
    /// `[t_last - display_seconds, t_last]`, boundaries inclusive.
    pub fn from_window(values: &[f32], timestamps: &[f64], display_seconds: f64) -> Self {
        let Some(&t_last) = timestamps.last() else {
            return Self::default();
        };
        let t0 = t_last - display_seconds;
        let mut x = Vec::new();
        let mut visible = Vec::new();
        for (&ts, &value) in timestamps.iter().zip(values) {
            let rel = ts - t0;
            if rel >= 0.0 && rel <= display_seconds {
                x.push(rel);
                visible.push(value);
            }
        }
        Self {
            x,
            values: visible,
            t0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn raw_y_range(&self) -> Option<(f32, f32)> {
        let first = *self.values.first()?;
        let (min, max) = self
            .values
            .iter()
            .fold((first, first), |(min, max), &v| (min.min(v), max.max(v)));
        Some((min, max))
    }
}

/// Vertical range for rendering: either pinned to operator-fixed bounds or an
/// exponential blend of each frame's raw range.
pub struct YRangeSmoother {
    fixed: Option<(f32, f32)>,
    alpha: f32,
    state: Option<(f32, f32)>,
}

impl YRangeSmoother {
    pub fn new(fixed: Option<(f32, f32)>, alpha: f32) -> Result<Self, ScopeError> {
        if let Some((min, max)) = fixed {
            if min >= max {
                return Err(ScopeError::InvalidYBounds { min, max });
            }
        }
        if !(0.0..=1.0).contains(&alpha) {
            return Err(ScopeError::InvalidSmoothing(alpha));
        }
        Ok(Self {
            fixed,
            alpha,
            state: None,
        })
    }

    /// Returned range always satisfies `max > min`. With `alpha = 0` the range
    /// freezes at the first observation; with `alpha = 1` it tracks the raw
    /// input every call.
    pub fn compute(&mut self, raw_min: f32, raw_max: f32) -> (f32, f32) {
        if let Some(bounds) = self.fixed {
            return bounds;
        }
        let (raw_min, raw_max) = expand_degenerate(raw_min, raw_max);
        let blended = match self.state {
            None => (raw_min, raw_max),
            Some((prev_min, prev_max)) => {
                let a = self.alpha;
                let new_min = prev_min * (1.0 - a) + raw_min * a;
                let new_max = prev_max * (1.0 - a) + raw_max * a;
                expand_degenerate(new_min, new_max)
            }
        };
        self.state = Some(blended);
        blended
    }
}

fn expand_degenerate(min: f32, max: f32) -> (f32, f32) {
    if max == min {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}
