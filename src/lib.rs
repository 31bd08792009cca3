// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

/*!
# Solph

This is a library for modelling energy systems as a graph of buses, sources,
sinks, converters and storages, connected by flows, and for turning such a
graph into a linear (or mixed-integer) optimisation problem that minimises the
costs of operating, and optionally extending, the system.

## Energy systems

An [`EnergySystem`] is created from a [`TimeAxis`], and filled with nodes and
the [`Flow`]s between them:

```ignore
let mut es = EnergySystem::new(TimeAxis::hourly(start, 24)?);
es.add_node(Source::new("gas"))?;
es.add_node(Bus::new("heat"))?;
es.add_node(
    Converter::new("boiler")
        .with_conversion_factor("gas", 1.0)
        .with_conversion_factor("heat", 0.9),
)?;
es.add_node(Sink::new("demand"))?;
es.add_flow("gas", "boiler", Flow::new().with_variable_costs(0.1))?;
es.add_flow("boiler", "heat", Flow::new())?;
es.add_flow("heat", "demand", Flow::new().with_nominal_capacity(10.0).with_fix(demand))?;
es.freeze()?;
```

Flows are the only place where variables are created.  Features can be
attached to them:

- an [`Investment`] turns the capacity of a flow (or a storage) into a
  decision variable, with ageing and retirement in multi-period models.
- [`NonConvex`] gives a flow an on/off status with minimum loads, start-up
  costs and minimum up and down times.
- a [`MultiObjective`] adds the flow to named objectives, which are weighted
  by the [`ModelConfig`].

## Validation

[`EnergySystem::freeze`] validates the energy system, and reports an
[`Error`] if, for example,

- a node has no flows.
- a sequence doesn't have a value for each step or period.
- bounds of a flow contradict each other, or are relative to an unknown
  capacity.
- a converter is missing conversion factors, or a storage doesn't have exactly
  one input and one output.

[`diagnostics::check`] finds configurations that are valid but suspicious,
like cycles without storages.

## Models and results

A [`Model`] is built from a frozen energy system, can be extended with the
helpers in [`constraints`], and is solved with the backend chosen in the
[`SolverConfig`].  Its [`Results`] are keyed by flow or node, and can be
exported as CSV.

```ignore
let mut model = Model::new(&es, ModelConfig::default())?;
model.solve(&SolverConfig::default())?;
let results = model.results()?;
println!("{:?}", results.flow("boiler", "heat")?.sequences["flow"]);
```
*/

mod config;
pub use config::{
    CancellationToken, EnergySystemConfig, ModelConfig, ObjectiveWeights, SolverBackend,
    SolverConfig,
};

mod error;
pub use error::{Error, ErrorKind};

mod sequence;
pub use sequence::Sequence;

mod time_axis;
pub use time_axis::{Period, TimeAxis};

mod node;
pub use node::{Bus, Converter, Node, NodeKind, Sink, Source, Storage};

mod flow;
pub use flow::Flow;

mod options;
pub use options::{Investment, MultiObjective, NonConvex};

mod energy_system;
pub use energy_system::{iterators, EnergySystem};

pub mod lp;

mod model;
pub use model::Model;

mod solver;
pub use solver::{SolveResult, SolverStatus, TerminationCondition};

mod results;
pub use results::{views, NodeResults, ResultKey, Results};

pub mod constraints;
pub mod diagnostics;
pub mod economics;

#[cfg(test)]
mod test_utils;
