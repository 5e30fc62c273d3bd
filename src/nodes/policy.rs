use rand::Rng;

use crate::errors::PolicyError;
use crate::types::AgentRole;

/// Decide the value an agent reports for its whole lifetime.
///
/// Honest agents report `network_value`. Liars report a value drawn
/// uniformly from `[1, max_value] \ {network_value}`: draw from
/// `[1, max_value - 1]` and shift draws at or above the network value
/// up by one. A liar needs `max_value >= 2`; anything less is reported
/// as a precondition violation rather than guessed at.
pub fn agent_value<R: Rng + ?Sized>(
    network_value: u32,
    max_value: u32,
    role: AgentRole,
    rng: &mut R,
) -> Result<u32, PolicyError> {
    if !role.is_liar() {
        return Ok(network_value);
    }
    check_liar_range(max_value)?;

    let mut fake = rng.gen_range(1..max_value);
    if fake >= network_value {
        fake += 1;
    }
    Ok(fake)
}

/// Liars need at least one value besides the network value to pick from.
pub fn check_liar_range(max_value: u32) -> Result<(), PolicyError> {
    if max_value < 2 {
        return Err(PolicyError::MaxValueTooSmall { max_value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    quickcheck! {
        fn honest_reports_network_value(network_value: u32, max_value: u32, seed: u64) -> bool {
            let mut rng = StdRng::seed_from_u64(seed);
            agent_value(network_value, max_value, AgentRole::Honest, &mut rng) == Ok(network_value)
        }

        fn liar_stays_in_range_and_differs(network_value: u16, max_value: u16, seed: u64) -> bool {
            let max_value = u32::from(max_value).max(2);
            let network_value = u32::from(network_value) % max_value + 1;
            let mut rng = StdRng::seed_from_u64(seed);
            match agent_value(network_value, max_value, AgentRole::Liar, &mut rng) {
                Ok(v) => v >= 1 && v <= max_value && v != network_value,
                Err(_) => false,
            }
        }
    }

    #[test]
    fn liar_rejects_degenerate_max_value() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            agent_value(1, 1, AgentRole::Liar, &mut rng),
            Err(PolicyError::MaxValueTooSmall { max_value: 1 })
        );
        assert_eq!(
            agent_value(1, 0, AgentRole::Liar, &mut rng),
            Err(PolicyError::MaxValueTooSmall { max_value: 0 })
        );
        // honest agents have no such constraint
        assert_eq!(agent_value(1, 0, AgentRole::Honest, &mut rng), Ok(1));
    }

    #[test]
    fn liar_at_max_value_picks_below_it() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let v = agent_value(10, 10, AgentRole::Liar, &mut rng).unwrap();
            assert!((1..10).contains(&v));
        }
    }

    #[test]
    fn liar_draw_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(42);
        let (network_value, max_value) = (3, 10);
        let trials = 90_000;
        let mut counts = [0usize; 11];
        for _ in 0..trials {
            let v = agent_value(network_value, max_value, AgentRole::Liar, &mut rng).unwrap();
            counts[v as usize] += 1;
        }

        assert_eq!(counts[0], 0);
        assert_eq!(counts[network_value as usize], 0);
        // 9 admissible values, ~10_000 hits each
        let expected = trials / 9;
        for v in (1..=max_value as usize).filter(|&v| v != network_value as usize) {
            let diff = counts[v].abs_diff(expected);
            assert!(diff < expected / 10, "value {} drawn {} times", v, counts[v]);
        }
    }
}
