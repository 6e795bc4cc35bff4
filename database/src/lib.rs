pub mod consts {
    pub mod consts;
}

pub mod model {
    pub mod filter;
    pub mod person;
}

pub mod database {
    pub mod options;
    pub mod request_manager;
}

pub mod persistence;
pub mod validation;
