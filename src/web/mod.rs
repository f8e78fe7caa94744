//! HTTP front end. Handlers only translate between HTTP and the network
//! request channels; all device logic runs in the network tasks.

pub mod api;
