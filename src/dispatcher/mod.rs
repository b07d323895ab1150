//! Task Dispatcher Module
//!
//! Decides whether a task is created at all and fans it out to the peers of the
//! farm. Creation is fire-and-forget: once `create_task` returns there is no
//! handle to await or cancel delivery, and failures on individual peers are
//! never reported back to the caller.

pub mod dispatcher;
