//! Scripted vendor endpoints and JSON scenarios for rehearsing policies
//! without a real cloud account.

mod endpoint;
mod run;
mod scenario;

pub use endpoint::ScriptedEndpoint;
pub use run::{run_scenario, SimulationReport};
pub use scenario::{load_scenario, parse_scenario, Mode, Scenario, Step};
