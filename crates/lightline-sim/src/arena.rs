use rand::Rng;

use crate::config::Tuning;

/// Where a snake starts a round, and which way it faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

/// Tries per spawn before accepting a point closer than the preferred gap.
const PLACEMENT_ATTEMPTS: usize = 32;

/// Random spawn points inside the arena margin, kept apart where possible.
pub fn spawn_points(rng: &mut impl Rng, count: usize, tuning: &Tuning) -> Vec<SpawnPoint> {
    let margin_x = tuning.spawn_margin.min(tuning.arena_width * 0.5);
    let margin_y = tuning.spawn_margin.min(tuning.arena_height * 0.5);
    let span_x = tuning.arena_width - 2.0 * margin_x;
    let span_y = tuning.arena_height - 2.0 * margin_y;
    let min_gap = (span_x.min(span_y) / (count.max(1) as f32).sqrt()) * 0.5;

    let mut points: Vec<SpawnPoint> = Vec::with_capacity(count);
    for _ in 0..count {
        let mut candidate = SpawnPoint {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
        };
        for _ in 0..PLACEMENT_ATTEMPTS {
            candidate = SpawnPoint {
                x: margin_x + rng.random::<f32>() * span_x,
                y: margin_y + rng.random::<f32>() * span_y,
                rotation: rng.random::<f32>() * std::f32::consts::TAU,
            };
            let clear = points.iter().all(|p| {
                let dx = p.x - candidate.x;
                let dy = p.y - candidate.y;
                dx * dx + dy * dy >= min_gap * min_gap
            });
            if clear {
                break;
            }
        }
        points.push(candidate);
    }
    points
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::SimConfig;

    #[test]
    fn spawns_stay_inside_margin() {
        let tuning = Tuning::from_config(&SimConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        let points = spawn_points(&mut rng, 8, &tuning);
        assert_eq!(points.len(), 8);
        for p in &points {
            assert!(p.x >= tuning.spawn_margin && p.x <= tuning.arena_width - tuning.spawn_margin);
            assert!(p.y >= tuning.spawn_margin && p.y <= tuning.arena_height - tuning.spawn_margin);
            assert!((0.0..std::f32::consts::TAU).contains(&p.rotation));
        }
    }

    #[test]
    fn same_seed_same_spawns() {
        let tuning = Tuning::from_config(&SimConfig::default());
        let a = spawn_points(&mut StdRng::seed_from_u64(3), 4, &tuning);
        let b = spawn_points(&mut StdRng::seed_from_u64(3), 4, &tuning);
        assert_eq!(a, b);
    }

    #[test]
    fn two_players_are_kept_apart() {
        let tuning = Tuning::from_config(&SimConfig::default());
        let mut rng = StdRng::seed_from_u64(11);
        let points = spawn_points(&mut rng, 2, &tuning);
        let dx = points[0].x - points[1].x;
        let dy = points[0].y - points[1].y;
        assert!((dx * dx + dy * dy).sqrt() > 50.0);
    }
}
