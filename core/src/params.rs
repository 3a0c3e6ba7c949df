//! Request parameters: capacity, productivity, shift, ratio overrides and
//! the archetype-specific blocks.

use crate::{normalize::de_opt_number, volume::VolumeScalars};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PRODUCTIVITE: f64 = 100.0;
pub const DEFAULT_HEURES_PAR_JOUR: f64 = 8.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineParams {
    /// Percent; hours are multiplied by `100 / productivite` when > 0.
    #[serde(default, deserialize_with = "de_opt_number")]
    pub productivite: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub heures_par_jour: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub idle_minutes: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub shift: Option<f64>,
    /// Overrides for the scalars carried by the volume payload.
    #[serde(flatten)]
    pub scalars: VolumeScalars,
    #[serde(default)]
    pub cci: CciParams,
    #[serde(default)]
    pub ccp: CcpParams,
    #[serde(default)]
    pub cna: CnaParams,
    #[serde(default)]
    pub cndp: CndpParams,
}

impl EngineParams {
    /// Fields set in `top` win over fields set in `self`.
    pub fn overlay(&self, top: &EngineParams) -> EngineParams {
        EngineParams {
            productivite: top.productivite.or(self.productivite),
            heures_par_jour: top.heures_par_jour.or(self.heures_par_jour),
            idle_minutes: top.idle_minutes.or(self.idle_minutes),
            shift: top.shift.or(self.shift),
            scalars: self.scalars.overlay(&top.scalars),
            cci: self.cci.overlay(&top.cci),
            ccp: self.ccp.overlay(&top.ccp),
            cna: self.cna.overlay(&top.cna),
            cndp: self.cndp.overlay(&top.cndp),
        }
    }

    pub fn productivite(&self) -> f64 {
        self.productivite.unwrap_or(DEFAULT_PRODUCTIVITE)
    }

    pub fn heures_par_jour(&self) -> f64 {
        self.heures_par_jour.unwrap_or(DEFAULT_HEURES_PAR_JOUR)
    }

    pub fn idle_minutes(&self) -> f64 {
        self.idle_minutes.unwrap_or(0.0)
    }

    pub fn shift(&self) -> f64 {
        self.shift.unwrap_or(1.0)
    }
}

macro_rules! overlay_impl {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $ty {
            pub fn overlay(&self, top: &$ty) -> $ty {
                $ty { $($field: top.$field.or(self.$field)),* }
            }
        }
    };
}

/// International mail centre: CO and CR handled with separate ratios.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CciParams {
    #[serde(default, deserialize_with = "de_opt_number")]
    pub nb_courrier_liasse_co: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub nb_courrier_liasse_cr: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub pct_retour_co: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub pct_retour_cr: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub pct_reclam_co: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub pct_reclam_cr: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub annotes_co: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub annotes_cr: Option<f64>,
}

overlay_impl!(CciParams {
    nb_courrier_liasse_co,
    nb_courrier_liasse_cr,
    pct_retour_co,
    pct_retour_cr,
    pct_reclam_co,
    pct_reclam_cr,
    annotes_co,
    annotes_cr,
});

/// Parcel and mail processing centre: items per handling unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CcpParams {
    #[serde(default, deserialize_with = "de_opt_number")]
    pub sac_input: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub caisson_input: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub courrier_input: Option<f64>,
}

overlay_impl!(CcpParams {
    sac_input,
    caisson_input,
    courrier_input,
});

/// National Amana centre: scaling of the bulk collecte and marché
/// ordinaire volumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CnaParams {
    #[serde(default, deserialize_with = "de_opt_number")]
    pub param_collecte: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub param_marche_ordinaire: Option<f64>,
}

overlay_impl!(CnaParams {
    param_collecte,
    param_marche_ordinaire,
});

/// National parcel distribution centre.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CndpParams {
    #[serde(default, deserialize_with = "de_opt_number")]
    pub pct_sac: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub pct_ed: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub colis_par_sac: Option<f64>,
}

overlay_impl!(CndpParams {
    pct_sac,
    pct_ed,
    colis_par_sac,
});
