pub mod gradient;

pub use gradient::{
    check_gradient, grad_check_sparse, numerical_gradient, rel_error,
    GradientCheckConfig, GradientCheckReport, GradientSample,
};
