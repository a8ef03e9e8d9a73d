pub mod page_agent;
pub mod solve_ctx;
pub mod solve_flow;

pub use page_agent::{AgentDeps, AgentExit, ApiFactory, PageAgent};
pub use solve_ctx::SolveCtx;
pub use solve_flow::{SolveFlow, SolveResult};
