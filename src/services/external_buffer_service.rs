//! External-Provider Buffer (C5): derives an effective availability for an
//! external dependency from a noisy published SLA and/or observed
//! availability. Deterministic and pure — no I/O.

/// The "10x pessimistic adjustment": real unavailability for an external
/// provider is assumed to be this many times the advertised unavailability.
pub const DEFAULT_BUFFER_MULTIPLIER: f64 = 11.0;
pub const DEFAULT_EXTERNAL_AVAILABILITY: f64 = 0.999;

#[derive(Debug, Clone, Copy)]
pub struct EffectiveAvailability {
    pub effective: f64,
    pub published_adjusted: Option<f64>,
}

/// Derive the effective availability for an external target.
///
/// Rules, in order: adjust the published SLA pessimistically by
/// `buffer_multiplier`; if both inputs are present take the lower (more
/// pessimistic) of the two; otherwise use whichever is present; otherwise
/// fall back to `default_availability`. `note` explains which branch fired.
pub fn effective_availability(
    published_sla: Option<f64>,
    observed_availability: Option<f64>,
    buffer_multiplier: f64,
    default_availability: f64,
) -> (EffectiveAvailability, String) {
    let published_adjusted = published_sla.map(|sla| (1.0 - buffer_multiplier * (1.0 - sla)).max(0.0));

    match (observed_availability, published_adjusted) {
        (Some(observed), Some(adjusted)) => {
            let effective = observed.min(adjusted);
            let note = format!(
                "used min(observed={:.4}, published_adjusted={:.4}) = {:.4}",
                observed, adjusted, effective
            );
            (EffectiveAvailability { effective, published_adjusted: Some(adjusted) }, note)
        }
        (Some(observed), None) => {
            let note = format!(
                "no published SLA; used observed availability {:.4}",
                observed
            );
            (EffectiveAvailability { effective: observed, published_adjusted: None }, note)
        }
        (None, Some(adjusted)) => {
            let note = format!(
                "no observed availability; used pessimistically-adjusted published SLA {:.4}",
                adjusted
            );
            (EffectiveAvailability { effective: adjusted, published_adjusted: Some(adjusted) }, note)
        }
        (None, None) => {
            let note = format!(
                "no published SLA or observed availability; defaulted to {:.4}",
                default_availability
            );
            (
                EffectiveAvailability { effective: default_availability, published_adjusted: None },
                note,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_present_takes_the_lower() {
        let (result, note) = effective_availability(
            Some(0.999),
            Some(0.95),
            DEFAULT_BUFFER_MULTIPLIER,
            DEFAULT_EXTERNAL_AVAILABILITY,
        );
        // published_adjusted = 1 - 11*(1-0.999) = 1 - 0.011 = 0.989
        assert!((result.published_adjusted.unwrap() - 0.989).abs() < 1e-9);
        assert!((result.effective - 0.95).abs() < 1e-9);
        assert!(note.contains("min"));
    }

    #[test]
    fn only_observed_present() {
        let (result, _) =
            effective_availability(None, Some(0.97), DEFAULT_BUFFER_MULTIPLIER, DEFAULT_EXTERNAL_AVAILABILITY);
        assert!((result.effective - 0.97).abs() < 1e-9);
    }

    #[test]
    fn only_published_present_gets_pessimistic_adjustment() {
        let (result, _) =
            effective_availability(Some(0.9999), None, DEFAULT_BUFFER_MULTIPLIER, DEFAULT_EXTERNAL_AVAILABILITY);
        let expected = 1.0 - 11.0 * (1.0 - 0.9999);
        assert!((result.effective - expected).abs() < 1e-9);
    }

    #[test]
    fn neither_present_defaults() {
        let (result, _) =
            effective_availability(None, None, DEFAULT_BUFFER_MULTIPLIER, DEFAULT_EXTERNAL_AVAILABILITY);
        assert!((result.effective - DEFAULT_EXTERNAL_AVAILABILITY).abs() < 1e-9);
    }

    #[test]
    fn adjustment_never_goes_negative() {
        let (result, _) =
            effective_availability(Some(0.0), None, DEFAULT_BUFFER_MULTIPLIER, DEFAULT_EXTERNAL_AVAILABILITY);
        assert_eq!(result.effective, 0.0);
    }
}
