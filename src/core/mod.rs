// Domain-layer modules and shared errors/models
pub mod intake {
    pub use crate::intake::*;
}

pub mod scoring {
    pub use crate::scoring::*;
}

pub mod vehicle_import {
    pub use crate::vehicle_import::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
