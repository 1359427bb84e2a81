use copa_server_app::domain::{
    PlayerId, RepoError, RepoUpdateError, TeamId,
    player::{Player, PlayerRepository},
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionError, TransactionTrait,
    sea_query::{Expr, SimpleExpr},
};

use crate::{
    entity::{player, player_round_result},
    to_i32, to_u32,
};

/// `baseline_kills + Σ player_round_results.kills` of the player row being updated.
pub(crate) fn derived_kills() -> SimpleExpr {
    Expr::cust(
        "baseline_kills + COALESCE((SELECT SUM(player_round_results.kills) \
         FROM player_round_results \
         WHERE player_round_results.player_id = players.id), 0)",
    )
}

async fn recorded_kills<C: ConnectionTrait>(c: &C, player_id: PlayerId) -> Result<i64, DbErr> {
    let total: Option<Option<i64>> = player_round_result::Entity::find()
        .select_only()
        .column_as(player_round_result::Column::Kills.sum(), "total")
        .filter(player_round_result::Column::PlayerId.eq(player_id.0))
        .into_tuple()
        .one(c)
        .await?;
    Ok(total.flatten().unwrap_or(0))
}

pub struct PlayerRepositoryImpl {
    db: DatabaseConnection,
}

impl PlayerRepositoryImpl {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub(crate) fn model_to_player(model: player::Model) -> Player {
        Player {
            id: PlayerId(model.id),
            team_id: TeamId(model.team_id),
            name: model.name,
            kills: to_u32(model.kills),
            is_reserve: model.is_reserve,
            baseline_kills: to_u32(model.baseline_kills),
        }
    }
}

#[async_trait::async_trait]
impl PlayerRepository for PlayerRepositoryImpl {
    async fn list_players(&self) -> Result<Vec<Player>, RepoError> {
        let models = player::Entity::find()
            .order_by_asc(player::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(models.into_iter().map(Self::model_to_player).collect())
    }

    async fn list_team_players(&self, team_id: TeamId) -> Result<Vec<Player>, RepoError> {
        let models = player::Entity::find()
            .filter(player::Column::TeamId.eq(team_id.0))
            .order_by_asc(player::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(models.into_iter().map(Self::model_to_player).collect())
    }

    async fn store_kills(&self, kills: Vec<(PlayerId, u32)>) -> Result<(), RepoUpdateError> {
        if kills.is_empty() {
            return Ok(());
        }
        let res = self
            .db
            .transaction::<_, (), RepoUpdateError>(|c| {
                Box::pin(async move {
                    for (player_id, value) in kills {
                        let updated = player::Entity::update_many()
                            .col_expr(player::Column::Kills, Expr::value(to_i32(value)))
                            .filter(player::Column::Id.eq(player_id.0))
                            .exec(c)
                            .await
                            .map_err(|e| RepoUpdateError::StorageError(e.to_string()))?;
                        if updated.rows_affected == 0 {
                            return Err(RepoUpdateError::NotFound);
                        }
                    }
                    Ok(())
                })
            })
            .await;

        match res {
            Ok(()) => Ok(()),
            Err(TransactionError::Transaction(e)) => Err(e),
            Err(TransactionError::Connection(e)) => {
                Err(RepoUpdateError::StorageError(e.to_string()))
            }
        }
    }

    async fn rebase_kills(
        &self,
        player_id: PlayerId,
        target: u32,
    ) -> Result<Player, RepoUpdateError> {
        let res = self
            .db
            .transaction::<_, player::Model, RepoUpdateError>(|c| {
                Box::pin(async move {
                    let storage = |e: DbErr| RepoUpdateError::StorageError(e.to_string());
                    let model = player::Entity::find_by_id(player_id.0)
                        .one(c)
                        .await
                        .map_err(storage)?
                        .ok_or(RepoUpdateError::NotFound)?;
                    let recorded = recorded_kills(c, player_id).await.map_err(storage)?;
                    let baseline = i64::from(target) - recorded;
                    if baseline < 0 {
                        return Err(RepoUpdateError::Conflict);
                    }

                    player::Entity::update_many()
                        .col_expr(player::Column::BaselineKills, Expr::value(baseline))
                        .col_expr(player::Column::Kills, Expr::value(to_i32(target)))
                        .filter(player::Column::Id.eq(player_id.0))
                        .exec(c)
                        .await
                        .map_err(storage)?;
                    Ok(player::Model {
                        kills: to_i32(target),
                        baseline_kills: i32::try_from(baseline).unwrap_or(i32::MAX),
                        ..model
                    })
                })
            })
            .await;

        match res {
            Ok(model) => Ok(Self::model_to_player(model)),
            Err(TransactionError::Transaction(e)) => Err(e),
            Err(TransactionError::Connection(e)) => {
                Err(RepoUpdateError::StorageError(e.to_string()))
            }
        }
    }
}
