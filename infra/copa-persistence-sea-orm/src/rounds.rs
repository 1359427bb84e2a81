use std::collections::HashMap;

use chrono::Utc;
use copa_server_app::domain::{
    PlayerId, RepoCreateError, RepoError, RepoRetrieveError, RepoUpdateError, RoundId,
    RoundResultId, TeamId,
    round::{
        BaselinePolicy, PlayerRoundResult, ResetSummary, Round, RoundRepository, RoundResult,
        RoundResultQuery, RoundResultWrite,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionError, TransactionTrait, sea_query::Expr,
};

use crate::{
    entity::{player, player_round_result, round, round_result, team},
    players::derived_kills,
    teams::roster_ids,
    to_i32, to_u32,
};

pub struct RoundRepositoryImpl {
    db: DatabaseConnection,
}

impl RoundRepositoryImpl {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_round(model: round::Model) -> Round {
        Round {
            id: RoundId(model.id),
            name: model.name,
            created_at: model.created_at,
        }
    }

    fn model_to_result(
        model: round_result::Model,
        player_results: Vec<PlayerRoundResult>,
    ) -> RoundResult {
        RoundResult {
            id: RoundResultId(model.id),
            round_id: RoundId(model.round_id),
            team_id: TeamId(model.team_id),
            position: to_u32(model.position),
            position_points: to_u32(model.position_points),
            kills: to_u32(model.kills),
            booyah: model.booyah,
            player_results,
        }
    }
}

fn storage(e: DbErr) -> RepoUpdateError {
    RepoUpdateError::StorageError(e.to_string())
}

#[async_trait::async_trait]
impl RoundRepository for RoundRepositoryImpl {
    async fn create_round(&self, name: String) -> Result<Round, RepoCreateError> {
        let model = round::ActiveModel {
            id: NotSet,
            name: Set(name),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| RepoCreateError::StorageError(e.to_string()))?;
        Ok(Self::model_to_round(model))
    }

    async fn get_round(&self, round_id: RoundId) -> Result<Round, RepoRetrieveError> {
        round::Entity::find_by_id(round_id.0)
            .one(&self.db)
            .await
            .map_err(|e| RepoRetrieveError::StorageError(e.to_string()))?
            .map(Self::model_to_round)
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn list_rounds(&self) -> Result<Vec<Round>, RepoError> {
        let models = round::Entity::find()
            .order_by_asc(round::Column::CreatedAt)
            .order_by_asc(round::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(models.into_iter().map(Self::model_to_round).collect())
    }

    async fn delete_round(&self, round_id: RoundId) -> Result<(), RepoUpdateError> {
        let res = self
            .db
            .transaction::<_, (), RepoUpdateError>(|c| {
                Box::pin(async move {
                    let result_ids: Vec<i64> = round_result::Entity::find()
                        .select_only()
                        .column(round_result::Column::Id)
                        .filter(round_result::Column::RoundId.eq(round_id.0))
                        .into_tuple()
                        .all(c)
                        .await
                        .map_err(storage)?;
                    let touched: Vec<i64> = player_round_result::Entity::find()
                        .select_only()
                        .column(player_round_result::Column::PlayerId)
                        .filter(
                            player_round_result::Column::RoundResultId.is_in(result_ids.clone()),
                        )
                        .into_tuple()
                        .all(c)
                        .await
                        .map_err(storage)?;
                    player_round_result::Entity::delete_many()
                        .filter(player_round_result::Column::RoundResultId.is_in(result_ids))
                        .exec(c)
                        .await
                        .map_err(storage)?;
                    round_result::Entity::delete_many()
                        .filter(round_result::Column::RoundId.eq(round_id.0))
                        .exec(c)
                        .await
                        .map_err(storage)?;
                    let deleted = round::Entity::delete_by_id(round_id.0)
                        .exec(c)
                        .await
                        .map_err(storage)?;
                    if deleted.rows_affected == 0 {
                        return Err(RepoUpdateError::NotFound);
                    }

                    player::Entity::update_many()
                        .col_expr(player::Column::Kills, derived_kills())
                        .filter(player::Column::Id.is_in(touched))
                        .exec(c)
                        .await
                        .map_err(storage)?;
                    Ok(())
                })
            })
            .await;

        match res {
            Ok(()) => Ok(()),
            Err(TransactionError::Transaction(e)) => Err(e),
            Err(TransactionError::Connection(e)) => Err(storage(e)),
        }
    }

    async fn upsert_round_result(
        &self,
        write: RoundResultWrite,
    ) -> Result<RoundResult, RepoUpdateError> {
        let res = self
            .db
            .transaction::<_, RoundResult, RepoUpdateError>(|c| {
                Box::pin(async move {
                    let round_exists = round::Entity::find_by_id(write.round_id.0)
                        .one(c)
                        .await
                        .map_err(storage)?
                        .is_some();
                    let team_exists = team::Entity::find_by_id(write.team_id.0)
                        .one(c)
                        .await
                        .map_err(storage)?
                        .is_some();
                    if !round_exists || !team_exists {
                        return Err(RepoUpdateError::NotFound);
                    }

                    let roster = roster_ids(c, write.team_id).await.map_err(storage)?;
                    if write
                        .player_kills
                        .iter()
                        .any(|(player_id, _)| !roster.contains(player_id))
                    {
                        return Err(RepoUpdateError::Conflict);
                    }

                    let existing = round_result::Entity::find()
                        .filter(round_result::Column::RoundId.eq(write.round_id.0))
                        .filter(round_result::Column::TeamId.eq(write.team_id.0))
                        .one(c)
                        .await
                        .map_err(storage)?;

                    let result_id = match existing {
                        Some(model) => {
                            let mut active = round_result::ActiveModel::from(model);
                            active.position = Set(to_i32(write.position));
                            active.position_points = Set(to_i32(write.position_points));
                            active.kills = Set(to_i32(write.kills));
                            active.booyah = Set(write.booyah);
                            active.update(c).await.map_err(storage)?.id
                        }
                        None => {
                            round_result::ActiveModel {
                                id: NotSet,
                                round_id: Set(write.round_id.0),
                                team_id: Set(write.team_id.0),
                                position: Set(to_i32(write.position)),
                                position_points: Set(to_i32(write.position_points)),
                                kills: Set(to_i32(write.kills)),
                                booyah: Set(write.booyah),
                            }
                            .insert(c)
                            .await
                            .map_err(storage)?
                            .id
                        }
                    };

                    let written: Vec<i64> =
                        write.player_kills.iter().map(|(id, _)| id.0).collect();
                    player_round_result::Entity::delete_many()
                        .filter(player_round_result::Column::RoundResultId.eq(result_id))
                        .filter(player_round_result::Column::PlayerId.is_not_in(written))
                        .exec(c)
                        .await
                        .map_err(storage)?;

                    for (player_id, kills) in &write.player_kills {
                        let existing = player_round_result::Entity::find()
                            .filter(player_round_result::Column::RoundResultId.eq(result_id))
                            .filter(player_round_result::Column::PlayerId.eq(player_id.0))
                            .one(c)
                            .await
                            .map_err(storage)?;
                        match existing {
                            Some(row) => {
                                let mut row = player_round_result::ActiveModel::from(row);
                                row.kills = Set(to_i32(*kills));
                                row.update(c).await.map_err(storage)?;
                            }
                            None => {
                                player_round_result::ActiveModel {
                                    id: NotSet,
                                    round_result_id: Set(result_id),
                                    player_id: Set(player_id.0),
                                    kills: Set(to_i32(*kills)),
                                }
                                .insert(c)
                                .await
                                .map_err(storage)?;
                            }
                        }
                    }

                    player::Entity::update_many()
                        .col_expr(player::Column::Kills, derived_kills())
                        .filter(player::Column::TeamId.eq(write.team_id.0))
                        .exec(c)
                        .await
                        .map_err(storage)?;

                    Ok(RoundResult {
                        id: RoundResultId(result_id),
                        round_id: write.round_id,
                        team_id: write.team_id,
                        position: write.position,
                        position_points: write.position_points,
                        kills: write.kills,
                        booyah: write.booyah,
                        player_results: write
                            .player_kills
                            .iter()
                            .map(|(player_id, kills)| PlayerRoundResult {
                                player_id: *player_id,
                                kills: *kills,
                            })
                            .collect(),
                    })
                })
            })
            .await;

        match res {
            Ok(result) => Ok(result),
            Err(TransactionError::Transaction(e)) => Err(e),
            Err(TransactionError::Connection(e)) => Err(storage(e)),
        }
    }

    async fn query_round_results(
        &self,
        query: RoundResultQuery,
    ) -> Result<Vec<RoundResult>, RepoError> {
        let mut select = round_result::Entity::find();
        if let Some(round_id) = query.round_id {
            select = select.filter(round_result::Column::RoundId.eq(round_id.0));
        }
        if let Some(team_id) = query.team_id {
            select = select.filter(round_result::Column::TeamId.eq(team_id.0));
        }
        let results = select
            .order_by_asc(round_result::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        if results.is_empty() {
            return Ok(Vec::new());
        }

        let result_ids: Vec<i64> = results.iter().map(|r| r.id).collect();
        let rows = player_round_result::Entity::find()
            .filter(player_round_result::Column::RoundResultId.is_in(result_ids))
            .order_by_asc(player_round_result::Column::PlayerId)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;

        let mut by_result: HashMap<i64, Vec<PlayerRoundResult>> = HashMap::new();
        for row in rows {
            by_result
                .entry(row.round_result_id)
                .or_default()
                .push(PlayerRoundResult {
                    player_id: PlayerId(row.player_id),
                    kills: to_u32(row.kills),
                });
        }

        Ok(results
            .into_iter()
            .map(|model| {
                let player_results = by_result.remove(&model.id).unwrap_or_default();
                Self::model_to_result(model, player_results)
            })
            .collect())
    }

    async fn reset_rounds(&self, policy: BaselinePolicy) -> Result<ResetSummary, RepoUpdateError> {
        let res = self
            .db
            .transaction::<_, ResetSummary, RepoUpdateError>(|c| {
                Box::pin(async move {
                    let rebase = match policy {
                        BaselinePolicy::KeepMvp => player::Entity::update_many()
                            .col_expr(player::Column::BaselineKills, derived_kills())
                            .col_expr(player::Column::Kills, derived_kills()),
                        BaselinePolicy::Clear => player::Entity::update_many()
                            .col_expr(player::Column::BaselineKills, Expr::value(0))
                            .col_expr(player::Column::Kills, Expr::value(0)),
                    };
                    let players = rebase.exec(c).await.map_err(storage)?;

                    let player_results = player_round_result::Entity::delete_many()
                        .exec(c)
                        .await
                        .map_err(storage)?;
                    let results = round_result::Entity::delete_many()
                        .exec(c)
                        .await
                        .map_err(storage)?;
                    let rounds = round::Entity::delete_many()
                        .exec(c)
                        .await
                        .map_err(storage)?;

                    team::Entity::update_many()
                        .col_expr(team::Column::TeamKills, Expr::value(0))
                        .col_expr(team::Column::PositionPoints, Expr::value(0))
                        .col_expr(team::Column::Booyahs, Expr::value(0))
                        .col_expr(
                            team::Column::TotalPoints,
                            Expr::col(team::Column::PenaltyPoints).mul(-1),
                        )
                        .exec(c)
                        .await
                        .map_err(storage)?;

                    Ok(ResetSummary {
                        rounds_removed: rounds.rows_affected,
                        round_results_removed: results.rows_affected,
                        player_round_results_removed: player_results.rows_affected,
                        players_rebased: players.rows_affected,
                    })
                })
            })
            .await;

        match res {
            Ok(summary) => Ok(summary),
            Err(TransactionError::Transaction(e)) => Err(e),
            Err(TransactionError::Connection(e)) => Err(storage(e)),
        }
    }
}
