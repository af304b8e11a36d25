use super::{GeometryError, PlotGeometry, Position, Ring};

/// Minimum positions in a closed linear ring (triangle plus closing point)
const MIN_RING_POSITIONS: usize = 4;

/// Checks that a geometry is well formed.
///
/// Rules:
/// - Every polygon has at least one ring
/// - A multi-polygon has at least one polygon
/// - Every ring has at least 4 positions and is closed
/// - Every position has 2 or 3 finite ordinates
pub fn validate(geometry: &PlotGeometry) -> Result<(), GeometryError> {
    match geometry {
        PlotGeometry::Polygon(rings) => validate_polygon(rings),
        PlotGeometry::MultiPolygon(polygons) => {
            if polygons.is_empty() {
                return Err(GeometryError::Empty);
            }
            polygons.iter().try_for_each(|rings| validate_polygon(rings))
        }
    }
}

fn validate_polygon(rings: &[Ring]) -> Result<(), GeometryError> {
    if rings.is_empty() {
        return Err(GeometryError::Empty);
    }
    rings.iter().try_for_each(|ring| validate_ring(ring))
}

fn validate_ring(ring: &[Position]) -> Result<(), GeometryError> {
    ring.iter().try_for_each(|position| validate_position(position))?;

    if ring.len() < MIN_RING_POSITIONS {
        return Err(GeometryError::RingTooShort { points: ring.len() });
    }

    if ring.first() != ring.last() {
        return Err(GeometryError::UnclosedRing);
    }

    Ok(())
}

fn validate_position(position: &[f64]) -> Result<(), GeometryError> {
    if !(2..=3).contains(&position.len()) {
        return Err(GeometryError::InvalidPosition {
            ordinates: position.len(),
        });
    }
    if position.iter().any(|v| !v.is_finite()) {
        return Err(GeometryError::NonFiniteOrdinate);
    }
    Ok(())
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    fn square() -> Ring {
        vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
        ]
    }

    #[test]
    fn test_closed_ring_is_valid() {
        assert!(validate_ring(&square()).is_ok());
    }

    #[test]
    fn test_short_ring_rejected() {
        let ring = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        assert_eq!(
            validate_ring(&ring),
            Err(GeometryError::RingTooShort { points: 2 })
        );
    }

    #[test]
    fn test_unclosed_ring_rejected() {
        let mut ring = square();
        ring.pop();
        ring.push(vec![0.5, 0.5]);
        assert_eq!(validate_ring(&ring), Err(GeometryError::UnclosedRing));
    }

    #[test]
    fn test_position_dimensions() {
        assert!(validate_position(&[1.0, 2.0]).is_ok());
        assert!(validate_position(&[1.0, 2.0, 3.0]).is_ok());
        assert_eq!(
            validate_position(&[1.0]),
            Err(GeometryError::InvalidPosition { ordinates: 1 })
        );
        assert_eq!(
            validate_position(&[f64::NAN, 1.0]),
            Err(GeometryError::NonFiniteOrdinate)
        );
    }

    #[test]
    fn test_empty_geometries_rejected() {
        assert_eq!(
            validate(&PlotGeometry::Polygon(vec![])),
            Err(GeometryError::Empty)
        );
        assert_eq!(
            validate(&PlotGeometry::MultiPolygon(vec![])),
            Err(GeometryError::Empty)
        );
        assert_eq!(
            validate(&PlotGeometry::MultiPolygon(vec![vec![]])),
            Err(GeometryError::Empty)
        );
    }
}
