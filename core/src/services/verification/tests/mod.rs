mod service_tests;
mod state_machine_tests;
