use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};
use thiserror::Error;
use tracing::info;

/// The closed set of component kinds which can appear in a parameter catalog or a size table.
#[derive(Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, PartialEq, Serialize)]
pub enum ComponentKind {
    #[serde(rename = "solar collector")]
    #[strum(serialize = "solar collector")]
    SolarCollector,
    #[serde(rename = "photovoltaic")]
    #[strum(serialize = "photovoltaic")]
    Photovoltaic,
    #[serde(rename = "inverter")]
    #[strum(serialize = "inverter")]
    Inverter,
    #[serde(rename = "heat pump")]
    #[strum(serialize = "heat pump")]
    HeatPump,
    #[serde(rename = "electric resistance")]
    #[strum(serialize = "electric resistance")]
    ElectricResistance,
    #[serde(rename = "gas burner")]
    #[strum(serialize = "gas burner")]
    GasBurner,
    #[serde(rename = "thermal storage tank")]
    #[strum(serialize = "thermal storage tank")]
    ThermalStorageTank,
    #[serde(rename = "gas tank WH")]
    #[strum(serialize = "gas tank WH")]
    GasTankWaterHeater,
    #[serde(rename = "solar pump")]
    #[strum(serialize = "solar pump")]
    SolarPump,
    #[serde(rename = "distribution pump")]
    #[strum(serialize = "distribution pump")]
    DistributionPump,
    #[serde(rename = "piping")]
    #[strum(serialize = "piping")]
    Piping,
}

/// A parameter value as held in the catalog. Most parameters are scalars; piping carries a list
/// of discrete diameters and a circulation flag.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    List(Vec<f64>),
    Flag(bool),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterRecord {
    pub component: ComponentKind,
    pub parameter: String,
    pub value: ParameterValue,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SizeRecord {
    pub component: ComponentKind,
    pub size: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Error)]
#[error("Parameter '{parameter}' is missing or malformed for component '{component}'")]
pub struct MissingParameterError {
    component: ComponentKind,
    parameter: String,
}

impl MissingParameterError {
    pub(crate) fn new(component: ComponentKind, parameter: &str) -> Self {
        Self {
            component,
            parameter: parameter.to_string(),
        }
    }
}

/// Immutable lookup from (component kind, parameter name) to a parameter value.
#[derive(Clone, Debug, Default)]
pub struct ParameterCatalog {
    entries: IndexMap<(ComponentKind, String), ParameterValue>,
}

impl ParameterCatalog {
    pub fn from_records(records: &[ParameterRecord]) -> anyhow::Result<Self> {
        let mut entries = IndexMap::with_capacity(records.len());
        for record in records {
            let key = (record.component, record.parameter.clone());
            if entries.contains_key(&key) {
                anyhow::bail!(
                    "Parameter '{}' was given more than once for component '{}'",
                    record.parameter,
                    record.component
                );
            }
            entries.insert(key, record.value.clone());
        }
        Ok(Self { entries })
    }

    pub fn contains_component(&self, component: ComponentKind) -> bool {
        self.entries.keys().any(|(kind, _)| *kind == component)
    }

    fn value(&self, component: ComponentKind, parameter: &str) -> Option<&ParameterValue> {
        self.entries.get(&(component, parameter.to_string()))
    }

    pub fn number(
        &self,
        component: ComponentKind,
        parameter: &str,
    ) -> Result<f64, MissingParameterError> {
        self.optional_number(component, parameter)?
            .ok_or_else(|| MissingParameterError::new(component, parameter))
    }

    /// Look up a scalar which the component can do without. A value of the wrong shape is still
    /// an error.
    pub fn optional_number(
        &self,
        component: ComponentKind,
        parameter: &str,
    ) -> Result<Option<f64>, MissingParameterError> {
        match self.value(component, parameter) {
            None => Ok(None),
            Some(ParameterValue::Number(number)) => Ok(Some(*number)),
            Some(_) => Err(MissingParameterError::new(component, parameter)),
        }
    }

    pub fn list(
        &self,
        component: ComponentKind,
        parameter: &str,
    ) -> Result<Vec<f64>, MissingParameterError> {
        match self.value(component, parameter) {
            Some(ParameterValue::List(values)) if !values.is_empty() => Ok(values.clone()),
            Some(ParameterValue::Number(number)) => Ok(vec![*number]),
            _ => Err(MissingParameterError::new(component, parameter)),
        }
    }

    /// Flags may be given as booleans or as 0/1 numbers.
    pub fn flag(
        &self,
        component: ComponentKind,
        parameter: &str,
    ) -> Result<bool, MissingParameterError> {
        match self.value(component, parameter) {
            Some(ParameterValue::Flag(flag)) => Ok(*flag),
            Some(ParameterValue::Number(number)) => Ok(*number != 0.),
            _ => Err(MissingParameterError::new(component, parameter)),
        }
    }
}

/// Typed parameters for one component model, resolvable from a catalog.
pub trait FromCatalog: Default + Sized {
    const COMPONENT: ComponentKind;

    fn from_catalog(catalog: &ParameterCatalog) -> anyhow::Result<Self>;

    /// Resolve parameters from the catalog, or fall back to defaults if no catalog was supplied.
    fn resolve(catalog: Option<&ParameterCatalog>) -> anyhow::Result<Self> {
        match catalog {
            Some(catalog) => Self::from_catalog(catalog),
            None => {
                info!(
                    "No parameters were passed for the {} component model, using defaults.",
                    Self::COMPONENT
                );
                Ok(Self::default())
            }
        }
    }
}

/// Sizes or capacities per component kind, in SI units (m2, m3, W, m).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComponentSizes {
    sizes: IndexMap<ComponentKind, f64>,
}

impl ComponentSizes {
    pub fn from_records(records: &[SizeRecord]) -> anyhow::Result<Self> {
        let mut sizes = IndexMap::with_capacity(records.len());
        for record in records {
            if record.size < 0. {
                anyhow::bail!(
                    "Size of component '{}' must not be negative, got {}",
                    record.component,
                    record.size
                );
            }
            if sizes.insert(record.component, record.size).is_some() {
                anyhow::bail!("Size of component '{}' was given more than once", record.component);
            }
        }
        Ok(Self { sizes })
    }

    pub fn get(&self, component: ComponentKind) -> Option<f64> {
        self.sizes.get(&component).copied()
    }

    /// Add a size for a component that has none, logging the substitution. A given size is
    /// kept.
    pub fn with_default(mut self, component: ComponentKind, size: f64) -> Self {
        self.sizes.entry(component).or_insert_with(|| {
            info!("Could not find the size of the {component}. Sizing it to {size}.");
            size
        });
        self
    }

    /// Look up a size, substituting a default (and logging that) when it is absent.
    pub fn get_or(&self, component: ComponentKind, default: f64) -> f64 {
        self.get(component).unwrap_or_else(|| {
            info!("Could not find the size of the {component}. Setting it to {default}.");
            default
        })
    }
}

impl FromIterator<(ComponentKind, f64)> for ComponentSizes {
    fn from_iter<T: IntoIterator<Item = (ComponentKind, f64)>>(iter: T) -> Self {
        Self {
            sizes: iter.into_iter().collect(),
        }
    }
}
