use afines::filament::{Filament, FilamentParams};
use afines::motor::{HeadState, Motor, MotorParams};
use afines::simbox::{BoundaryCondition, SimBox};
use afines_numerical::Vec2;
use rand::rngs::SmallRng;
use rand::SeedableRng;

const DT: f64 = 1e-4;

fn box10() -> SimBox {
    SimBox::new(BoundaryCondition::Periodic, 10.0, 10.0)
}

fn fil_params(kl: f64, kb: f64, frac_force: f64) -> FilamentParams {
    FilamentParams {
        kl,
        max_ext_ratio: 1.5,
        fene: false,
        kb,
        dt: DT,
        temperature: 0.0,
        frac_force,
        kgrow: 0.0,
        lgrow: 0.0,
        l0_min: 0.1,
        l0_max: 2.0,
        max_springs: 10,
        spring_rest_len: 1.0,
        bead_length: 0.1,
        viscosity: 1e-3,
    }
}

#[test]
fn two_bead_filament_relaxes_to_rest_length() {
    let mut f = Filament::new(vec![Vec2::new(-0.4, 0.0), Vec2::new(0.4, 0.0)], fil_params(10.0, 0.0, 1e9));
    let bx = box10();
    let mut rng = SmallRng::seed_from_u64(42);
    for _ in 0..10_000 {
        f.zero_forces();
        f.update_stretching(&bx);
        f.update_bending();
        f.integrate(&bx, &mut rng);
    }
    assert!((f.springs()[0].length() - 1.0).abs() < 1e-3);
    assert!(f.pe_stretch() < 1e-4);
}

#[test]
fn bending_rod_straightens() {
    let eps = 0.1;
    let positions = vec![
        Vec2::new(-1.0, eps),
        Vec2::new(-0.5, 0.0),
        Vec2::new(0.0, eps),
        Vec2::new(0.5, 0.0),
        Vec2::new(1.0, eps),
    ];
    let mut f = Filament::new(positions, fil_params(100.0, 1.0, 1e9));
    let bx = box10();
    let mut rng = SmallRng::seed_from_u64(42);
    for _ in 0..50_000 {
        f.zero_forces();
        f.update_stretching(&bx);
        f.update_bending();
        f.integrate(&bx, &mut rng);
    }
    let y0 = f.beads()[0].pos().y;
    for b in f.beads() {
        assert!((b.pos().y - y0).abs() < 1e-3, "bead not collinear: {:?}", b.pos());
    }
}

#[test]
fn motor_walks_along_filament() {
    let mut filaments = vec![Filament::new((0..6).map(|i| Vec2::new(i as f64, 0.0)).collect(), fil_params(100.0, 0.0, 1e9))];
    let bx = box10();
    filaments[0].update_stretching(&bx);

    let motor_params = MotorParams {
        k_on: 0.0,
        k_off: 0.0,
        k_end: 0.0,
        v0: 1.0,
        f_stall: 10.0,
        kl: 1.0,
        rest_length: 0.0,
        viscosity: 1e-3,
        head_length: 0.02,
        cutoff: 0.1,
        dt: DT,
        temperature: 0.0,
    };
    let mut motor = Motor::new(1, Vec2::new(2.5, 0.0), Vec2::new(2.5, 0.0), motor_params);
    motor.bind(0, &mut filaments, 0, 2, 0.5);

    let quadrants = afines::quadrants::Quadrants::new(1.0);
    let mut rng = SmallRng::seed_from_u64(7);
    let n_steps = (1.0 / DT) as u64;
    for _ in 0..n_steps {
        motor.step(&mut filaments, &quadrants, &bx, &mut rng);
    }

    let arc_pos = |h: HeadState| -> f64 {
        match h {
            HeadState::Bound { spring_idx, pos_on_spring, .. } => spring_idx as f64 + pos_on_spring,
            HeadState::Free { .. } => f64::NAN,
        }
    };
    let advanced = arc_pos(motor.heads()[0]) - 2.5;
    assert!((advanced - 1.0).abs() < 0.2, "expected ~1.0 arclength advance, got {advanced}");
}

#[test]
fn fracture_splits_overstretched_filament() {
    // beads pulled far past l0=1.0: spring force kl*(len-l0) = 10*(10-1) = 90, well past frac_force
    let mut f = Filament::new(vec![Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0)], fil_params(10.0, 0.0, 1.0));
    let bx = SimBox::new(BoundaryCondition::Open, 100.0, 100.0);
    f.zero_forces();
    f.update_stretching(&bx);

    let node = f.first_overstretched_spring();
    assert_eq!(node, Some(0));
    let tail = f.split_off(node.unwrap());
    assert_eq!(f.beads().len(), 1);
    assert_eq!(tail.beads().len(), 1);
}

#[test]
fn lees_edwards_disp_matches_direct_minus_shift() {
    let mut bx = SimBox::new(BoundaryCondition::LeesEdwards, 10.0, 10.0);
    bx.update_d_strain(0.3);
    let direct = Vec2::new(0.0, 9.0);
    let d = bx.rij(direct);
    let expected = direct - Vec2::new(bx.delta_rx(), bx.ly());
    assert!((d - expected).length() < 1e-9);
}

#[test]
fn detailed_balance_bound_fraction_approaches_k_on_over_total() {
    let k = 1.0;
    let motor_params = MotorParams {
        k_on: k,
        k_off: k,
        k_end: k,
        v0: 0.0,
        f_stall: 10.0,
        kl: 1.0,
        rest_length: 0.1,
        viscosity: 1e-3,
        head_length: 0.02,
        cutoff: 0.3,
        dt: 1e-2,
        temperature: 0.0,
    };
    let mut filaments = vec![Filament::new((0..3).map(|i| Vec2::new(i as f64, 0.0)).collect(), fil_params(100.0, 0.0, 1e9))];
    let bx = box10();
    filaments[0].update_stretching(&bx);

    let mut quadrants = afines::quadrants::Quadrants::new(1.0);
    let positions = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)];
    quadrants.rebuild(std::iter::once((0usize, positions.as_slice())), &bx);

    let mut motor = Motor::new(1, Vec2::new(1.0, 0.05), Vec2::new(1.0, -0.05), motor_params);
    let mut rng = SmallRng::seed_from_u64(99);
    let n_steps = 20_000u64;
    let mut bound_steps = 0u64;
    for _ in 0..n_steps {
        motor.step(&mut filaments, &quadrants, &bx, &mut rng);
        if motor.is_bound(0) {
            bound_steps += 1;
        }
    }
    let observed = bound_steps as f64 / n_steps as f64;
    // one head, symmetric on/off rates: expected bound fraction k_on/(k_on+k_off) = 0.5
    assert!((observed - 0.5).abs() < 0.1, "observed bound fraction {observed}");
}
