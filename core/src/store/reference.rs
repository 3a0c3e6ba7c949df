use super::ReferenceStore;
use crate::{
    error::WorkloadResult,
    reference::{Flux, MappingRule, ReferenceCatalogue, Segment, Sens, UnitConversion},
};
use rusqlite::params;

impl ReferenceStore {
    // ── Codes ─────────────────────────────────────────────────────

    pub fn insert_flux(&self, flux: &Flux) -> WorkloadResult<()> {
        self.conn.execute(
            "INSERT INTO flux (id, code, libelle) VALUES (?1, ?2, ?3)",
            params![flux.id, flux.code, flux.label],
        )?;
        Ok(())
    }

    pub fn insert_sens(&self, sens: &Sens) -> WorkloadResult<()> {
        self.conn.execute(
            "INSERT INTO volume_sens (id, code, libelle) VALUES (?1, ?2, ?3)",
            params![sens.id, sens.code, sens.label],
        )?;
        Ok(())
    }

    pub fn insert_segment(&self, segment: &Segment) -> WorkloadResult<()> {
        self.conn.execute(
            "INSERT INTO volume_segments (id, code, libelle) VALUES (?1, ?2, ?3)",
            params![segment.id, segment.code, segment.label],
        )?;
        Ok(())
    }

    pub fn flux(&self) -> WorkloadResult<Vec<Flux>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, code, libelle FROM flux ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Flux {
                id: row.get(0)?,
                code: row.get(1)?,
                label: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn sens(&self) -> WorkloadResult<Vec<Sens>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, code, libelle FROM volume_sens ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Sens {
                id: row.get(0)?,
                code: row.get(1)?,
                label: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn segments(&self) -> WorkloadResult<Vec<Segment>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, code, libelle FROM volume_segments ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Segment {
                id: row.get(0)?,
                code: row.get(1)?,
                label: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Mapping rules ─────────────────────────────────────────────

    pub fn insert_mapping_rule(&self, rule: &MappingRule) -> WorkloadResult<()> {
        self.conn.execute(
            "INSERT INTO volume_mapping_rules
                 (id, flux_id, sens_id, segment_id, nom_contient, ui_path, priority, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                rule.id,
                rule.flux_id,
                rule.sens_id,
                rule.segment_id,
                rule.keyword,
                rule.ui_path,
                rule.priority,
                rule.description,
            ],
        )?;
        Ok(())
    }

    pub fn mapping_rules(&self) -> WorkloadResult<Vec<MappingRule>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, flux_id, sens_id, segment_id, nom_contient, ui_path, priority, description
             FROM volume_mapping_rules ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(MappingRule {
                id: row.get(0)?,
                flux_id: row.get(1)?,
                sens_id: row.get(2)?,
                segment_id: row.get(3)?,
                keyword: row
                    .get::<_, Option<String>>(4)?
                    .filter(|k| !k.trim().is_empty()),
                ui_path: row.get(5)?,
                priority: row.get(6)?,
                description: row.get(7)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Unit conversions ──────────────────────────────────────────

    pub fn insert_unit_conversion(&self, unit: &UnitConversion) -> WorkloadResult<()> {
        self.conn.execute(
            "INSERT INTO unite_conversion_rules (unite_mesure, facteur_conversion, description)
             VALUES (?1, ?2, ?3)",
            params![unit.unit_code, unit.factor, unit.description],
        )?;
        Ok(())
    }

    pub fn unit_conversions(&self) -> WorkloadResult<Vec<UnitConversion>> {
        let mut stmt = self.conn.prepare(
            "SELECT unite_mesure, facteur_conversion, description
             FROM unite_conversion_rules ORDER BY unite_mesure",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UnitConversion {
                unit_code: row.get(0)?,
                factor: row.get(1)?,
                description: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Read the five reference tables and build the catalogue.
    pub fn load_catalogue(&self) -> WorkloadResult<ReferenceCatalogue> {
        ReferenceCatalogue::new(
            self.flux()?,
            self.sens()?,
            self.segments()?,
            self.mapping_rules()?,
            self.unit_conversions()?,
        )
    }
}
