// Sanity run of the softmax loss on a synthetic batch.
// All loss logic lives in the library (src/lib.rs and its modules).
//   cargo run                      -- defaults (reg = 0, vectorized)
//   cargo run -- config.json       -- settings from a SoftmaxLossConfig file
use rand::{rngs::StdRng, Rng, SeedableRng};
use softmax_linear::{
    grad_check_sparse, GradientCheckConfig, Matrix, SoftmaxLoss, SoftmaxLossConfig,
};

const NUM_TRAIN: usize = 200;
const DIMS: usize = 64;
const CLASSES: usize = 10;

fn print_check(label: &str, report: &softmax_linear::check::GradientCheckReport) {
    println!("\nGradient check ({label}):");
    for s in &report.samples {
        println!(
            "  W[{:>2},{:>2}]  numerical: {:>12.6e}  analytic: {:>12.6e}  relative error: {:.3e}",
            s.row, s.col, s.numerical, s.analytic, s.rel_error
        );
    }
    println!(
        "  max relative error: {:.3e}  failures: {}/{}",
        report.max_relative_error, report.num_failures, report.num_checked()
    );
}

fn run(config: SoftmaxLossConfig) -> softmax_linear::Result<()> {
    let check = GradientCheckConfig::default();
    let mut rng = StdRng::seed_from_u64(check.seed);

    let x = Matrix::random_normal(NUM_TRAIN, DIMS, 1.0, &mut rng);
    let y: Vec<usize> = (0..NUM_TRAIN).map(|_| rng.gen_range(0..CLASSES)).collect();
    let w = Matrix::random_normal(DIMS, CLASSES, 1e-4, &mut rng);

    println!("softmax-linear: N = {NUM_TRAIN}, D = {DIMS}, C = {CLASSES}");
    println!("  strategy: {:?}, reg = {}", config.strategy, config.reg);

    let (loss, _) = config.evaluate(&w, &x, &y)?;
    println!("\nloss: {loss:.6}");
    println!("sanity check: {:.6}  (-ln(1/C), expected with tiny weights)", (CLASSES as f64).ln());

    let (loss_naive, grad_naive) = SoftmaxLoss::naive(&w, &x, &y, config.reg)?;
    let (loss_vec, grad_vec) = SoftmaxLoss::vectorized(&w, &x, &y, config.reg)?;
    println!("\nnaive loss:      {loss_naive:.10}");
    println!("vectorized loss: {loss_vec:.10}");
    println!("loss difference: {:.3e}", (loss_naive - loss_vec).abs());
    println!("gradient max abs difference: {:.3e}", grad_naive.max_abs_diff(&grad_vec)?);

    // Checks use larger weights so the gradient is well away from zero.
    let w = Matrix::random_normal(DIMS, CLASSES, 1e-2, &mut rng);
    for reg in [0.0, 5e1] {
        let (_, grad) = SoftmaxLoss::vectorized(&w, &x, &y, reg)?;
        let report = grad_check_sparse(
            |w: &Matrix| SoftmaxLoss::vectorized(w, &x, &y, reg).map(|(loss, _)| loss),
            &w,
            &grad,
            &check,
            &mut rng,
        )?;
        print_check(&format!("reg = {reg}"), &report);
    }

    Ok(())
}

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => match SoftmaxLossConfig::load_json(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: could not load config {path}: {e}");
                std::process::exit(1);
            }
        },
        None => SoftmaxLossConfig::default(),
    };

    if let Err(e) = run(config) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
