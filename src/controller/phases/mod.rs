//! Phase implementations for the Hostproxy reconcile pipeline.
//!
//! Each phase is a zero-sized struct implementing [`Phase`]; their order is
//! fixed by [`super::pipeline::PIPELINE`].

mod deletion;
mod deployment;
mod finalizer;
mod init_status;
mod scale;
mod service;
mod steady_state;

pub use deletion::DeletionCheck;
pub use deployment::ConvergeDeployment;
pub use finalizer::AttachFinalizer;
pub use init_status::InitStatus;
pub use scale::ConvergeScale;
pub use service::ConvergeService;
pub use steady_state::SteadyState;

use super::hostproxy::Context;
use super::pipeline::{Exit, Outcome, Pass, Phase, Step};
