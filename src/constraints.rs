// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Constraints that can be added to a [`Model`] after it was built.
//!
//! Each helper takes the model, adds its variables and constraints to it and
//! fails with a [`ConfigurationError`][crate::ErrorKind::ConfigurationError]
//! if the flows or nodes it refers to don't have the required features.
//! Flows are identified by the labels of their `(source, target)` nodes.
//!
//! ```ignore
//! let mut model = Model::new(&es, ModelConfig::default())?;
//! constraints::emission_limit(&mut model, None, 100.0)?;
//! constraints::set_idle_time(&mut model, ("chp", "el"), ("el", "pump"), 3, "idle")?;
//! model.solve(&SolverConfig::default())?;
//! ```

mod equate;
mod idle_time;
mod limits;
mod storage_level;

pub use equate::{equate_flows, equate_flows_by_keyword, equate_variables};
pub use idle_time::set_idle_time;
pub use limits::{
    additional_investment_flow_limit, emission_limit, generic_integral_limit, investment_limit,
    limit_active_flow_count, limit_active_flow_count_by_keyword, shared_limit,
};
pub use storage_level::storage_level_constraint;

use crate::lp::VarId;
use crate::{Error, Model};

/// The status variables of a nonconvex flow.
fn status_vars(model: &Model, (source, target): (&str, &str)) -> Result<Vec<VarId>, Error> {
    model
        .flow_entry(source, target)?
        .status
        .clone()
        .ok_or_else(|| {
            Error::configuration(format!("Flow:({source}, {target}) is not nonconvex."))
        })
}
