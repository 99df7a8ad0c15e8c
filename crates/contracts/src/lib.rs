//! Общие типы (DTO) между сервисом синхронизации и витриной

pub mod domain;
pub mod system;
pub mod usecases;
