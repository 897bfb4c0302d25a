//! Route and ETA computation

use tracing::{debug, warn};

use crate::{Coordinate, RouteCalculator, TrackingError};

/// Route computed for a single tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteResult {
    pub duration_seconds: f64,
}

impl RouteResult {
    pub fn eta_minutes(&self) -> i64 {
        eta_minutes(self.duration_seconds)
    }
}

/// Whole minutes for a duration, halves rounded up
pub fn eta_minutes(duration_seconds: f64) -> i64 {
    (duration_seconds / 60.0 + 0.5).floor() as i64
}

/// Asks the route calculator how long the trip to the destination takes
pub struct RouteEngine<R> {
    calculator: R,
    /// Calculator resource name on the route service
    calculator_name: String,
}

impl<R> RouteEngine<R>
where
    R: RouteCalculator,
{
    pub fn new(calculator: R, calculator_name: String) -> Self {
        Self {
            calculator,
            calculator_name,
        }
    }

    /// Duration of the first route leg. `Ok(None)` when the calculator found
    /// no leg, which means the ETA is unavailable, not that the call failed.
    pub async fn compute_eta(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Option<RouteResult>, TrackingError> {
        let legs = self
            .calculator
            .calculate_route(&self.calculator_name, origin, destination)
            .await
            .map_err(|e| {
                warn!(calculator = %self.calculator_name, error = %e, "Route calculation failed");
                TrackingError::from(e)
            })?;

        let result = legs
            .first()
            .map(|leg| leg.duration_seconds)
            .filter(|secs| {
                let usable = secs.is_finite() && *secs >= 0.0;
                if !usable {
                    warn!(
                        calculator = %self.calculator_name,
                        duration = *secs,
                        "Unusable route duration, no ETA"
                    );
                }
                usable
            })
            .map(|duration_seconds| RouteResult { duration_seconds });
        debug!(legs = legs.len(), duration = ?result.map(|r| r.duration_seconds), "Route computed");

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CollaboratorError, RouteLeg};

    struct FixedRoute(Result<Vec<RouteLeg>, CollaboratorError>);

    impl RouteCalculator for FixedRoute {
        async fn calculate_route(
            &self,
            _calculator: &str,
            _origin: Coordinate,
            _destination: Coordinate,
        ) -> Result<Vec<RouteLeg>, CollaboratorError> {
            self.0.clone()
        }
    }

    fn leg(duration_seconds: f64) -> RouteLeg {
        RouteLeg {
            duration_seconds,
            distance_km: None,
        }
    }

    #[test]
    fn minutes_round_half_up() {
        assert_eq!(3, eta_minutes(150.0));
        assert_eq!(5, eta_minutes(299.0));
        assert_eq!(4, eta_minutes(240.0));
        assert_eq!(2, eta_minutes(149.0));
        assert_eq!(0, eta_minutes(29.0));
        assert_eq!(1, eta_minutes(30.0));
        assert_eq!(0, eta_minutes(0.0));
    }

    #[tokio::test]
    async fn first_leg_wins() -> Result<(), TrackingError> {
        let engine = RouteEngine::new(FixedRoute(Ok(vec![leg(240.0), leg(900.0)])), "calc".to_string());
        let origin = Coordinate::new(-123.10, 49.30)?;
        let destination = Coordinate::new(-74.0333, 40.7418)?;

        let result = engine.compute_eta(origin, destination).await?;

        assert_eq!(Some(RouteResult { duration_seconds: 240.0 }), result);
        assert_eq!(Some(4), result.map(|r| r.eta_minutes()));

        Ok(())
    }

    #[tokio::test]
    async fn unusable_duration_is_unavailable() -> Result<(), TrackingError> {
        let here = Coordinate::new(0.0, 0.0)?;

        for secs in [f64::NAN, f64::INFINITY, -30.0] {
            let engine = RouteEngine::new(FixedRoute(Ok(vec![leg(secs)])), "calc".to_string());
            assert_eq!(None, engine.compute_eta(here, here).await?);
        }

        Ok(())
    }

    #[tokio::test]
    async fn no_leg_is_unavailable() -> Result<(), TrackingError> {
        let engine = RouteEngine::new(FixedRoute(Ok(vec![])), "calc".to_string());
        let here = Coordinate::new(0.0, 0.0)?;

        assert_eq!(None, engine.compute_eta(here, here).await?);

        Ok(())
    }

    #[tokio::test]
    async fn failure_is_reported() -> Result<(), TrackingError> {
        let engine = RouteEngine::new(
            FixedRoute(Err(CollaboratorError::unavailable("route", "throttled"))),
            "calc".to_string(),
        );
        let here = Coordinate::new(0.0, 0.0)?;

        assert!(matches!(
            engine.compute_eta(here, here).await,
            Err(TrackingError::CollaboratorUnavailable { service: "route", .. })
        ));

        Ok(())
    }
}
