use super::{loose_number, ReferenceStore};
use crate::{
    error::WorkloadResult,
    model::{Centre, Direction, Organisation, Position, RoleType, Task},
    types::{CentreId, FluxId, PositionId, SegmentId, SensId, TaskId},
};
use rusqlite::{params, types::Value as SqlValue};

/// A centre-poste row. `effectif_actuel` is stored as received.
#[derive(Debug, Clone, Default)]
pub struct NewCentrePoste {
    pub id: PositionId,
    pub centre_id: CentreId,
    pub poste_id: i64,
    pub effectif_actuel: Option<String>,
}

/// A task row. Durations and `base_calcul` are stored as received, e.g.
/// `"0,83"` or `"85%"`.
#[derive(Debug, Clone, Default)]
pub struct NewTache {
    pub id: TaskId,
    pub centre_poste_id: PositionId,
    pub nom_tache: String,
    pub phase: String,
    pub unite_mesure: String,
    pub famille_uo: String,
    pub produit: String,
    pub flux_id: Option<FluxId>,
    pub sens_id: Option<SensId>,
    pub segment_id: Option<SegmentId>,
    pub moyenne_min: Option<String>,
    pub moy_sec: Option<String>,
    pub base_calcul: Option<String>,
    pub etat: String,
    pub ordre: i64,
}

struct RawTask {
    task: Task,
    moyenne_min: SqlValue,
    moy_sec: SqlValue,
    base_calcul: SqlValue,
}

impl ReferenceStore {
    // ── Directions & centres ──────────────────────────────────────

    pub fn insert_direction(&self, direction: &Direction) -> WorkloadResult<()> {
        self.conn.execute(
            "INSERT INTO directions (id, libelle) VALUES (?1, ?2)",
            params![direction.id, direction.label],
        )?;
        Ok(())
    }

    pub fn insert_centre(&self, centre: &Centre) -> WorkloadResult<()> {
        self.conn.execute(
            "INSERT INTO centres (id, libelle, direction_id, categorie_id, aps)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                centre.id,
                centre.label,
                centre.direction_id,
                centre.category_id,
                centre.aps_declared,
            ],
        )?;
        Ok(())
    }

    pub fn directions(&self) -> WorkloadResult<Vec<Direction>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, libelle FROM directions ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Direction {
                id: row.get(0)?,
                label: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn centres(&self) -> WorkloadResult<Vec<Centre>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, libelle, direction_id, categorie_id, aps FROM centres ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Centre {
                id: row.get(0)?,
                label: row.get(1)?,
                direction_id: row.get(2)?,
                category_id: row.get(3)?,
                aps_declared: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Postes ────────────────────────────────────────────────────

    pub fn insert_poste(
        &self,
        id: i64,
        code: &str,
        label: &str,
        role_type: RoleType,
    ) -> WorkloadResult<()> {
        let type_poste = match role_type {
            RoleType::Mod => "MOD",
            RoleType::Moi => "MOI",
            RoleType::Aps => "APS",
        };
        self.conn.execute(
            "INSERT INTO postes (id, code, libelle, type_poste) VALUES (?1, ?2, ?3, ?4)",
            params![id, code, label, type_poste],
        )?;
        Ok(())
    }

    pub fn insert_centre_poste(&self, row: &NewCentrePoste) -> WorkloadResult<()> {
        self.conn.execute(
            "INSERT INTO centre_postes (id, centre_id, poste_id, effectif_actuel)
             VALUES (?1, ?2, ?3, ?4)",
            params![row.id, row.centre_id, row.poste_id, row.effectif_actuel],
        )?;
        Ok(())
    }

    /// Centre-postes joined with their poste.
    pub fn positions(&self) -> WorkloadResult<Vec<Position>> {
        let mut stmt = self.conn.prepare(
            "SELECT cp.id, cp.centre_id, p.code, p.libelle, p.type_poste, cp.effectif_actuel
             FROM centre_postes cp
             JOIN postes p ON p.id = cp.poste_id
             ORDER BY cp.id",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, PositionId>(0)?,
                    row.get::<_, CentreId>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, SqlValue>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut positions = Vec::with_capacity(raw.len());
        for (id, centre_id, poste_code, label, type_poste, effectif) in raw {
            let role_type = RoleType::parse(&type_poste).unwrap_or_else(|| {
                log::warn!("centre_poste {id}: unknown type_poste {type_poste:?}, counted as MOD");
                RoleType::Mod
            });
            positions.push(Position {
                id,
                centre_id,
                poste_code,
                label,
                current_staffing: loose_number("effectif_actuel", effectif)?.unwrap_or(0.0),
                role_type,
            });
        }
        Ok(positions)
    }

    // ── Tâches ────────────────────────────────────────────────────

    pub fn insert_tache(&self, t: &NewTache) -> WorkloadResult<()> {
        self.conn.execute(
            "INSERT INTO taches
                 (id, centre_poste_id, nom_tache, phase, unite_mesure, famille_uo, produit,
                  flux_id, sens_id, segment_id, moyenne_min, moy_sec, base_calcul, etat, ordre)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                t.id,
                t.centre_poste_id,
                t.nom_tache,
                t.phase,
                t.unite_mesure,
                t.famille_uo,
                t.produit,
                t.flux_id,
                t.sens_id,
                t.segment_id,
                t.moyenne_min,
                t.moy_sec,
                t.base_calcul,
                t.etat,
                t.ordre,
            ],
        )?;
        Ok(())
    }

    pub fn tasks(&self) -> WorkloadResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, centre_poste_id, nom_tache, phase, unite_mesure, famille_uo, produit,
                    flux_id, sens_id, segment_id, moyenne_min, moy_sec, base_calcul, etat, ordre
             FROM taches ORDER BY centre_poste_id, ordre, id",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok(RawTask {
                    task: Task {
                        id: row.get(0)?,
                        position_id: row.get(1)?,
                        name: row.get(2)?,
                        phase: row.get(3)?,
                        unit: row.get(4)?,
                        family: row.get(5)?,
                        product: row.get(6)?,
                        flux_id: row.get(7)?,
                        sens_id: row.get(8)?,
                        segment_id: row.get(9)?,
                        mean_minutes: None,
                        mean_seconds: None,
                        base_calcul_pct: None,
                        state: row.get(13)?,
                        ordering: row.get(14)?,
                    },
                    moyenne_min: row.get(10)?,
                    moy_sec: row.get(11)?,
                    base_calcul: row.get(12)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|r| {
                let mut task = r.task;
                task.mean_minutes = loose_number("moyenne_min", r.moyenne_min)?;
                task.mean_seconds = loose_number("moy_sec", r.moy_sec)?;
                task.base_calcul_pct = loose_number("base_calcul", r.base_calcul)?;
                Ok(task)
            })
            .collect()
    }

    /// Read directions, centres, positions and tasks into the arena.
    pub fn load_organisation(&self) -> WorkloadResult<Organisation> {
        let organisation = Organisation::new(
            self.directions()?,
            self.centres()?,
            self.positions()?,
            self.tasks()?,
        );
        log::info!(
            "organisation loaded: {} centres, {} tasks",
            organisation.centres().count(),
            organisation.task_count()
        );
        Ok(organisation)
    }
}
