// Business logic services layer
//
// Orchestration that sits between the CLI handlers and the ERF pipeline
// stages.

pub mod notify;
