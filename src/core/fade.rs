//=========================================================================
// Fade Driver
//=========================================================================
//
// Full-screen fade overlay: an RGBA color whose alpha is animated
// between opaque and transparent. Transitions use it to hide scene
// swaps; embeddings render the current color however they draw.
//
// One animation at a time. A fade requested while another is running is
// dropped, not queued; the in-flight fade keeps its completion callback.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, warn};

//=== Internal Dependencies ===============================================

use crate::core::error::SceneError;
use crate::core::Completion;

//=== Constants ===========================================================

/// Default fade duration in seconds.
pub const DEFAULT_FADE_SECS: f32 = 1.0;

//=== Color ===============================================================

/// An RGBA color with `f32` components in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Opaque black, the conventional fade overlay color.
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    /// Creates a color from raw components.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// This color with its alpha replaced.
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Componentwise interpolation from `self` to `other`, with `t`
    /// clamped to `[0.0, 1.0]`.
    pub fn lerp(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }
}

//=== FadeDirection =======================================================

/// Which way a fade moves the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    /// Alpha rising toward opaque; the scene underneath disappears.
    Out,

    /// Alpha falling toward transparent; the scene underneath reappears.
    In,
}

//=== FadeOutcome =========================================================

/// How a fade request was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeOutcome {
    /// The overlay was already at the target alpha (or the duration was
    /// not positive); the callback has already run.
    Completed,

    /// An animation is now in flight; the callback runs when it ends.
    Started,
}

//=== FadeAnim ============================================================

struct FadeAnim {
    from: Color,
    to: Color,
    progress: f32,
    rate: f32,
    direction: FadeDirection,
    on_complete: Option<Completion>,
}

//=== FadeDriver ==========================================================

/// Drives the full-screen fade overlay.
///
/// The overlay starts fully opaque, so a freshly built stage shows
/// nothing until the first fade-in. Progress advances in
/// [`tick`](Self::tick) by wall-clock delta; the driver holds no clock
/// of its own.
///
/// # Examples
///
/// ```rust
/// use stagecraft::core::fade::{Color, FadeDriver, FadeOutcome};
///
/// let mut fade = FadeDriver::new(Color::BLACK, 0.5);
/// assert_eq!(fade.color().a, 1.0);
///
/// let outcome = fade.fade_in(None).unwrap();
/// assert_eq!(outcome, FadeOutcome::Started);
///
/// fade.tick(0.25);
/// assert!(fade.is_fading());
/// fade.tick(0.25);
/// assert_eq!(fade.color().a, 0.0);
/// assert!(!fade.is_fading());
/// ```
pub struct FadeDriver {
    color: Color,
    default_color: Color,
    default_duration: f32,
    anim: Option<FadeAnim>,
}

impl FadeDriver {
    /// Creates a driver with the given defaults.
    ///
    /// The overlay begins at `default_color` forced to full opacity.
    pub fn new(default_color: Color, default_duration: f32) -> Self {
        Self {
            color: default_color.with_alpha(1.0),
            default_color,
            default_duration,
            anim: None,
        }
    }

    /// The overlay color right now. Embeddings render this each frame.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Whether a fade animation is in flight.
    ///
    /// A driver resting at any alpha, including midway after a
    /// [`cancel`](Self::cancel), is not fading.
    pub fn is_fading(&self) -> bool {
        self.anim.is_some()
    }

    /// Direction of the in-flight fade, if any.
    pub fn direction(&self) -> Option<FadeDirection> {
        self.anim.as_ref().map(|anim| anim.direction)
    }

    /// The duration used by [`fade_out`](Self::fade_out) and
    /// [`fade_in`](Self::fade_in).
    pub fn default_duration(&self) -> f32 {
        self.default_duration
    }

    /// Fades to opaque using the default color and duration.
    pub fn fade_out(&mut self, on_complete: Option<Completion>) -> Result<FadeOutcome, SceneError> {
        let target = self.default_color.with_alpha(1.0);
        self.fade_to(target, self.default_duration, on_complete)
    }

    /// Fades to transparent using the default color and duration.
    pub fn fade_in(&mut self, on_complete: Option<Completion>) -> Result<FadeOutcome, SceneError> {
        let target = self.default_color.with_alpha(0.0);
        self.fade_to(target, self.default_duration, on_complete)
    }

    /// Animates the overlay from its current color to `to` over
    /// `duration` seconds.
    ///
    /// Three acceptance paths:
    ///
    /// - Another fade is in flight: the request is dropped with
    ///   [`SceneError::FadeBusy`] and `on_complete` never runs. The
    ///   in-flight fade is unaffected.
    /// - The overlay is already at the target alpha, or `duration` is
    ///   not positive: the overlay snaps to `to`, `on_complete` runs
    ///   before this call returns, and the result is
    ///   [`FadeOutcome::Completed`].
    /// - Otherwise an animation starts and `on_complete` fires from the
    ///   [`tick`](Self::tick) that finishes it.
    pub fn fade_to(
        &mut self,
        to: Color,
        duration: f32,
        on_complete: Option<Completion>,
    ) -> Result<FadeOutcome, SceneError> {
        if self.anim.is_some() {
            warn!("Fade request dropped: a fade is already in progress");
            return Err(SceneError::FadeBusy);
        }

        // Already at the target alpha, or instant: no animation record.
        if self.color.a == to.a || !(duration > 0.0) {
            self.color = to;
            if let Some(callback) = on_complete {
                callback();
            }
            return Ok(FadeOutcome::Completed);
        }

        let direction = if to.a > self.color.a {
            FadeDirection::Out
        } else {
            FadeDirection::In
        };
        debug!("Fade {direction:?} started ({duration}s)");
        self.anim = Some(FadeAnim {
            from: self.color,
            to,
            progress: 0.0,
            rate: 1.0 / duration,
            direction,
            on_complete,
        });
        Ok(FadeOutcome::Started)
    }

    /// Advances the in-flight fade by `dt` seconds.
    ///
    /// Returns the direction of a fade that finished during this tick.
    /// On the finishing tick the overlay lands exactly on the target
    /// color and the completion callback fires.
    pub fn tick(&mut self, dt: f32) -> Option<FadeDirection> {
        let mut anim = self.anim.take()?;
        anim.progress += anim.rate * dt;
        if anim.progress >= 1.0 {
            self.color = anim.to;
            debug!("Fade {:?} finished", anim.direction);
            if let Some(callback) = anim.on_complete.take() {
                callback();
            }
            Some(anim.direction)
        } else {
            self.color = anim.from.lerp(anim.to, anim.progress);
            self.anim = Some(anim);
            None
        }
    }

    /// Abandons the in-flight fade, if any.
    ///
    /// The overlay keeps its mid-fade color and the abandoned fade's
    /// completion callback is discarded. Returns whether a fade was
    /// actually cancelled.
    pub fn cancel(&mut self) -> bool {
        if self.anim.take().is_some() {
            debug!("Fade cancelled");
            true
        } else {
            false
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
