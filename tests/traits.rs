use gbm_probe::platform::gbm::GbmPlatform;
use gbm_probe::platform::ConfigRequest;
use gbm_probe::program::ProgramBinary;
use gbm_probe::{ContextInfo, Error, ErrorKind, ProbeOptions, ProbeOptionsBuilder, Version};

pub trait FailToCompileIfNotSendSync
where
    Self: Send + Sync,
{
}

impl FailToCompileIfNotSendSync for Error {}
impl FailToCompileIfNotSendSync for ErrorKind {}
impl FailToCompileIfNotSendSync for Version {}
impl FailToCompileIfNotSendSync for ConfigRequest {}
impl FailToCompileIfNotSendSync for ProbeOptions {}
impl FailToCompileIfNotSendSync for ProbeOptionsBuilder {}
impl FailToCompileIfNotSendSync for ContextInfo {}
impl FailToCompileIfNotSendSync for ProgramBinary {}
impl FailToCompileIfNotSendSync for GbmPlatform {}

pub trait FailToCompileIfNotClone
where
    Self: Clone,
{
}

impl FailToCompileIfNotClone for Error {}
impl FailToCompileIfNotClone for Version {}
impl FailToCompileIfNotClone for ConfigRequest {}
impl FailToCompileIfNotClone for ProbeOptions {}
impl FailToCompileIfNotClone for ProbeOptionsBuilder {}
