//! Per-frame violation rules.
//!
//! `FrameRules` is the visual monitor's whole mutable state: the look-away
//! streak start. It is a field of the loop object rather than ambient global
//! state so future multi-candidate sessions stay independent. The clock is
//! passed in, so tests drive simulated time instead of sleeping.

use std::time::{Duration, Instant};

use crate::detect::FaceBox;
use crate::report::ViolationKind;

/// Horizontal offset (pixel units) beyond which a face counts as off-center.
pub const OFF_CENTER_PX: u32 = 150;

/// How long a face must stay off-center before a Looking Away report fires.
pub const LOOK_AWAY_DURATION: Duration = Duration::from_secs(3);

/// One rule firing, ready to be stamped into a violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleDecision {
    pub kind: ViolationKind,
    pub details: String,
}

/// Rule state machine evaluated once per captured frame.
#[derive(Debug, Default)]
pub struct FrameRules {
    /// When the current continuous off-center streak began. Empty while the
    /// tracked face is centered. At most one streak is active at a time.
    look_away_since: Option<Instant>,
}

impl FrameRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current streak start, if a streak is active.
    pub fn look_away_since(&self) -> Option<Instant> {
        self.look_away_since
    }

    /// Evaluate both rules against one frame's detections.
    ///
    /// Multiple-faces fires on every qualifying frame with no debounce.
    /// The look-away rule tracks the primary face: the largest box by area,
    /// ties broken toward the earlier box in detector order. A frame with no
    /// detected face leaves the streak untouched (a face that turns far
    /// enough to vanish from the detector must not forgive the streak).
    pub fn evaluate(
        &mut self,
        faces: &[FaceBox],
        frame_width: u32,
        now: Instant,
    ) -> Vec<RuleDecision> {
        let mut decisions = Vec::new();

        if faces.len() > 1 {
            decisions.push(RuleDecision {
                kind: ViolationKind::MultipleFaces,
                details: format!("{} faces detected", faces.len()),
            });
        }

        if let Some(face) = primary_face(faces) {
            let center_x = frame_width / 2;
            if face.center_x().abs_diff(center_x) > OFF_CENTER_PX {
                match self.look_away_since {
                    None => self.look_away_since = Some(now),
                    Some(since) if now.duration_since(since) > LOOK_AWAY_DURATION => {
                        decisions.push(RuleDecision {
                            kind: ViolationKind::LookingAway,
                            details: "Face not centered".to_string(),
                        });
                        // One report per qualifying streak; timing restarts
                        // from empty, not from the fire moment.
                        self.look_away_since = None;
                    }
                    Some(_) => {}
                }
            } else {
                self.look_away_since = None;
            }
        }

        decisions
    }
}

/// The face the look-away timer tracks when several are present: largest
/// area wins, ties break toward the earlier box in detector order.
fn primary_face(faces: &[FaceBox]) -> Option<&FaceBox> {
    let mut best: Option<&FaceBox> = None;
    for face in faces {
        let larger = match best {
            None => true,
            Some(current) => face.area() > current.area(),
        };
        if larger {
            best = Some(face);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: u32 = 640;

    fn centered() -> FaceBox {
        // Center at 320 == frame center.
        FaceBox::new(280, 200, 80, 80)
    }

    fn off_center() -> FaceBox {
        // Center at 520, offset 200 from frame center.
        FaceBox::new(480, 200, 80, 80)
    }

    #[test]
    fn primary_face_is_largest_box() {
        let small = FaceBox::new(0, 0, 10, 10);
        let large = FaceBox::new(100, 0, 50, 50);
        assert_eq!(primary_face(&[small, large]), Some(&large));
        assert_eq!(primary_face(&[large, small]), Some(&large));
        assert_eq!(primary_face(&[]), None);
    }

    #[test]
    fn primary_face_tie_breaks_to_earlier_box() {
        let first = FaceBox::new(0, 0, 20, 20);
        let second = FaceBox::new(100, 0, 20, 20);
        assert_eq!(primary_face(&[first, second]), Some(&first));
    }

    #[test]
    fn no_faces_preserves_streak() {
        let mut rules = FrameRules::new();
        let start = Instant::now();
        rules.evaluate(&[off_center()], WIDTH, start);
        assert!(rules.look_away_since().is_some());
        rules.evaluate(&[], WIDTH, start + Duration::from_secs(1));
        assert_eq!(rules.look_away_since(), Some(start));
    }

    #[test]
    fn centered_face_resets_streak() {
        let mut rules = FrameRules::new();
        let start = Instant::now();
        rules.evaluate(&[off_center()], WIDTH, start);
        assert!(rules.look_away_since().is_some());
        let decisions = rules.evaluate(&[centered()], WIDTH, start + Duration::from_secs(1));
        assert!(decisions.is_empty());
        assert!(rules.look_away_since().is_none());
    }

    #[test]
    fn multi_face_frame_reports_every_time() {
        let mut rules = FrameRules::new();
        let now = Instant::now();
        for i in 0..3 {
            let decisions = rules.evaluate(
                &[centered(), FaceBox::new(0, 0, 40, 40)],
                WIDTH,
                now + Duration::from_millis(i * 100),
            );
            assert_eq!(decisions.len(), 1);
            assert_eq!(decisions[0].kind, ViolationKind::MultipleFaces);
            assert_eq!(decisions[0].details, "2 faces detected");
        }
    }

    #[test]
    fn multi_face_timer_follows_largest_box() {
        let mut rules = FrameRules::new();
        let start = Instant::now();
        // Large face off-center, small face centered: the streak starts.
        let small_centered = FaceBox::new(300, 0, 40, 40);
        rules.evaluate(&[small_centered, off_center()], WIDTH, start);
        assert_eq!(rules.look_away_since(), Some(start));
        // Large face back to center: the streak resets even though the small
        // box is now the off-center one.
        let small_off = FaceBox::new(0, 0, 40, 40);
        rules.evaluate(&[small_off, centered()], WIDTH, start + Duration::from_secs(1));
        assert!(rules.look_away_since().is_none());
    }
}
