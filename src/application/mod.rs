//! Application layer: conversion pipelines and the errors the CLI reports.

pub mod error;
pub mod render;
