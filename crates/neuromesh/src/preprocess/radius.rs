use crate::context::Diagnostics;
use crate::skeleton::Morphology;

/// Raise every radius below `floor` to `floor`, recording the changes.
pub fn apply_radius_floor(morph: &mut Morphology, floor: f64, diagnostics: &mut Diagnostics) {
    for section in morph.sections_mut() {
        let needs_clamp = section.samples().iter().any(|s| s.radius < floor);
        if !needs_clamp {
            continue;
        }
        for s in section.samples_mut() {
            if s.radius < floor {
                diagnostics.radius_clamps += 1;
                diagnostics.radius_clamp_delta += floor - s.radius;
                s.radius = floor;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{Sample, SectionType, Soma};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_floor_and_delta() {
        let mut morph = Morphology::new("r", Soma::new(Point3::origin(), 1.0));
        morph.add_arbor(
            "a",
            SectionType::Axon,
            vec![
                Sample::at(0.0, 0.0, 0.0, 0.05),
                Sample::at(1.0, 0.0, 0.0, 0.0),
                Sample::at(2.0, 0.0, 0.0, 0.5),
            ],
        );
        let mut diagnostics = Diagnostics::default();
        apply_radius_floor(&mut morph, 0.1, &mut diagnostics);
        assert_eq!(diagnostics.radius_clamps, 2);
        assert_relative_eq!(diagnostics.radius_clamp_delta, 0.15);
        assert!(morph.sections()[0].samples().iter().all(|s| s.radius >= 0.1));
    }
}
