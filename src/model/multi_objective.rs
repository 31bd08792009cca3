// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Named objectives of flows with a [`MultiObjective`][crate::MultiObjective].

use crate::lp::LinearExpr;

use super::builder::ModelBuilder;

impl ModelBuilder<'_> {
    /// Adds `sum(flow(t) * costs(t) * weight(t))` of every flow to each of its
    /// named objectives.
    pub(super) fn add_multiobjective_costs(&mut self) {
        let axis = self.axis;
        let mut objectives = std::mem::take(&mut self.objectives);

        for entry in &self.flows {
            let Some(multiobjective) = &entry.flow.multiobjective else {
                continue;
            };
            for (name, costs) in &multiobjective.costs {
                let objective = objectives.entry(name.clone()).or_insert_with(LinearExpr::new);
                for (t, var) in entry.vars.iter().enumerate() {
                    let factor = self.objective_weight(t) * self.discount(axis.period(t));
                    objective.add_term(*var, costs.get(t) * factor);
                }
            }
        }

        tracing::debug!("Added {} named objectives.", objectives.len());
        self.objectives = objectives;
    }
}
