use chrono::Utc;
use copa_core::TeamTotals;
use copa_server_app::domain::{
    PlayerId, RepoCreateError, RepoError, RepoRetrieveError, RepoUpdateError, TeamId,
    player::Player,
    team::{NewTeam, Team, TeamRepository, TeamStatus},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionError, TransactionTrait, sea_query::Expr,
};

use crate::{
    entity::{player, player_round_result, round_result, team},
    players::PlayerRepositoryImpl,
    to_i32, to_u32,
};

pub struct TeamRepositoryImpl {
    db: DatabaseConnection,
}

impl TeamRepositoryImpl {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub(crate) fn model_to_team(model: team::Model) -> Team {
        let status = TeamStatus::parse(&model.status).unwrap_or_else(|| {
            log::warn!(
                "Team {} has unknown status {:?}, treating it as pending",
                model.id,
                model.status
            );
            TeamStatus::Pending
        });
        Team {
            id: TeamId(model.id),
            name: model.name,
            tag: model.tag,
            status,
            group_name: model.group_name,
            booyahs: to_u32(model.booyahs),
            team_kills: to_u32(model.team_kills),
            penalty_points: to_u32(model.penalty_points),
            position_points: to_u32(model.position_points),
            total_points: model.total_points,
            created_at: model.created_at,
        }
    }

    async fn update_columns(
        &self,
        team_id: TeamId,
        columns: Vec<(team::Column, sea_orm::sea_query::SimpleExpr)>,
    ) -> Result<(), RepoUpdateError> {
        let mut update = team::Entity::update_many().filter(team::Column::Id.eq(team_id.0));
        for (column, value) in columns {
            update = update.col_expr(column, value);
        }
        let res = update
            .exec(&self.db)
            .await
            .map_err(|e| RepoUpdateError::StorageError(e.to_string()))?;
        if res.rows_affected == 0 {
            return Err(RepoUpdateError::NotFound);
        }
        Ok(())
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait::async_trait]
impl TeamRepository for TeamRepositoryImpl {
    async fn create_team(&self, new_team: NewTeam) -> Result<(Team, Vec<Player>), RepoCreateError> {
        let res = self
            .db
            .transaction::<_, (team::Model, Vec<player::Model>), RepoCreateError>(|c| {
                Box::pin(async move {
                    let team_model = team::ActiveModel {
                        id: NotSet,
                        name: Set(new_team.name),
                        tag: Set(new_team.tag),
                        status: Set(new_team.status.as_str().to_string()),
                        group_name: Set(None),
                        booyahs: Set(0),
                        team_kills: Set(0),
                        penalty_points: Set(0),
                        position_points: Set(0),
                        total_points: Set(0),
                        created_at: Set(Utc::now()),
                    }
                    .insert(c)
                    .await
                    .map_err(|e| {
                        if is_unique_violation(&e) {
                            RepoCreateError::Conflict
                        } else {
                            RepoCreateError::StorageError(e.to_string())
                        }
                    })?;

                    let mut players = Vec::with_capacity(new_team.players.len());
                    for new_player in new_team.players {
                        let model = player::ActiveModel {
                            id: NotSet,
                            team_id: Set(team_model.id),
                            name: Set(new_player.name),
                            kills: Set(0),
                            is_reserve: Set(new_player.is_reserve),
                            baseline_kills: Set(0),
                        }
                        .insert(c)
                        .await
                        .map_err(|e| RepoCreateError::StorageError(e.to_string()))?;
                        players.push(model);
                    }
                    Ok((team_model, players))
                })
            })
            .await;

        match res {
            Ok((team_model, player_models)) => Ok((
                Self::model_to_team(team_model),
                player_models
                    .into_iter()
                    .map(PlayerRepositoryImpl::model_to_player)
                    .collect(),
            )),
            Err(TransactionError::Transaction(e)) => Err(e),
            Err(TransactionError::Connection(e)) => {
                Err(RepoCreateError::StorageError(e.to_string()))
            }
        }
    }

    async fn get_team(&self, team_id: TeamId) -> Result<Team, RepoRetrieveError> {
        team::Entity::find_by_id(team_id.0)
            .one(&self.db)
            .await
            .map_err(|e| RepoRetrieveError::StorageError(e.to_string()))?
            .map(Self::model_to_team)
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn list_teams(&self) -> Result<Vec<Team>, RepoError> {
        let models = team::Entity::find()
            .order_by_asc(team::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(models.into_iter().map(Self::model_to_team).collect())
    }

    async fn set_status(&self, team_id: TeamId, status: TeamStatus) -> Result<(), RepoUpdateError> {
        self.update_columns(
            team_id,
            vec![(team::Column::Status, Expr::value(status.as_str()))],
        )
        .await
    }

    async fn set_group(
        &self,
        team_id: TeamId,
        group_name: Option<String>,
    ) -> Result<(), RepoUpdateError> {
        self.update_columns(team_id, vec![(team::Column::GroupName, Expr::value(group_name))])
            .await
    }

    async fn set_penalty(
        &self,
        team_id: TeamId,
        penalty_points: u32,
    ) -> Result<(), RepoUpdateError> {
        self.update_columns(
            team_id,
            vec![(team::Column::PenaltyPoints, Expr::value(to_i32(penalty_points)))],
        )
        .await
    }

    async fn store_totals(
        &self,
        team_id: TeamId,
        totals: TeamTotals,
    ) -> Result<(), RepoUpdateError> {
        self.update_columns(
            team_id,
            vec![
                (team::Column::TeamKills, Expr::value(to_i32(totals.team_kills))),
                (
                    team::Column::PositionPoints,
                    Expr::value(to_i32(totals.position_points)),
                ),
                (team::Column::Booyahs, Expr::value(to_i32(totals.booyahs))),
                (
                    team::Column::PenaltyPoints,
                    Expr::value(to_i32(totals.penalty_points)),
                ),
                (team::Column::TotalPoints, Expr::value(totals.total_points)),
            ],
        )
        .await
    }

    async fn delete_team(&self, team_id: TeamId) -> Result<(), RepoUpdateError> {
        let res = self
            .db
            .transaction::<_, (), RepoUpdateError>(|c| {
                Box::pin(async move {
                    let storage = |e: DbErr| RepoUpdateError::StorageError(e.to_string());

                    let player_ids: Vec<i64> = player::Entity::find()
                        .select_only()
                        .column(player::Column::Id)
                        .filter(player::Column::TeamId.eq(team_id.0))
                        .into_tuple()
                        .all(c)
                        .await
                        .map_err(storage)?;
                    let result_ids: Vec<i64> = round_result::Entity::find()
                        .select_only()
                        .column(round_result::Column::Id)
                        .filter(round_result::Column::TeamId.eq(team_id.0))
                        .into_tuple()
                        .all(c)
                        .await
                        .map_err(storage)?;

                    player_round_result::Entity::delete_many()
                        .filter(
                            player_round_result::Column::RoundResultId
                                .is_in(result_ids)
                                .or(player_round_result::Column::PlayerId.is_in(player_ids)),
                        )
                        .exec(c)
                        .await
                        .map_err(storage)?;
                    round_result::Entity::delete_many()
                        .filter(round_result::Column::TeamId.eq(team_id.0))
                        .exec(c)
                        .await
                        .map_err(storage)?;
                    player::Entity::delete_many()
                        .filter(player::Column::TeamId.eq(team_id.0))
                        .exec(c)
                        .await
                        .map_err(storage)?;
                    let deleted = team::Entity::delete_by_id(team_id.0)
                        .exec(c)
                        .await
                        .map_err(storage)?;
                    if deleted.rows_affected == 0 {
                        return Err(RepoUpdateError::NotFound);
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
}

/// Player ids of a team's roster, used by the round repository to validate
/// per-player rows inside its own transaction.
pub(crate) async fn roster_ids<C: sea_orm::ConnectionTrait>(
    c: &C,
    team_id: TeamId,
) -> Result<Vec<PlayerId>, DbErr> {
    let ids: Vec<i64> = player::Entity::find()
        .select_only()
        .column(player::Column::Id)
        .filter(player::Column::TeamId.eq(team_id.0))
        .into_tuple()
        .all(c)
        .await?;
    Ok(ids.into_iter().map(PlayerId).collect())
}

#[cfg(test)]
mod tests {
    use copa_server_app::domain::team::NewPlayer;

    use super::*;
    use crate::testing::test_db;

    fn new_team(tag: &str) -> NewTeam {
        NewTeam {
            name: format!("Team {}", tag),
            tag: tag.to_string(),
            status: TeamStatus::Pending,
            players: (0..5)
                .map(|i| NewPlayer {
                    name: format!("{}-{}", tag, i),
                    is_reserve: i >= 4,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_and_update_team() {
        let repo = TeamRepositoryImpl::new(test_db().await);
        let (team, players) = repo.create_team(new_team("QW")).await.unwrap();
        assert_eq!(team.status, TeamStatus::Pending);
        assert_eq!(players.len(), 5);
        assert!(players[4].is_reserve);

        repo.set_status(team.id, TeamStatus::Confirmed).await.unwrap();
        repo.set_group(team.id, Some("GRUPO A".to_string()))
            .await
            .unwrap();
        repo.set_penalty(team.id, 3).await.unwrap();
        repo.store_totals(
            team.id,
            TeamTotals {
                team_kills: 10,
                position_points: 20,
                booyahs: 1,
                penalty_points: 3,
                total_points: 27,
            },
        )
        .await
        .unwrap();

        let stored = repo.get_team(team.id).await.unwrap();
        assert_eq!(stored.status, TeamStatus::Confirmed);
        assert_eq!(stored.group_name.as_deref(), Some("GRUPO A"));
        assert_eq!(stored.total_points, 27);
        assert_eq!(stored.stored_totals().booyahs, 1);

        assert!(matches!(
            repo.set_status(TeamId(999), TeamStatus::Confirmed).await,
            Err(RepoUpdateError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_tag_conflicts_without_partial_insert() {
        let db = test_db().await;
        let repo = TeamRepositoryImpl::new(db.clone());
        repo.create_team(new_team("QW")).await.unwrap();
        assert!(matches!(
            repo.create_team(new_team("QW")).await,
            Err(RepoCreateError::Conflict)
        ));
        assert_eq!(repo.list_teams().await.unwrap().len(), 1);
        let players = player::Entity::find().all(&db).await.unwrap();
        assert_eq!(players.len(), 5);
    }

    #[tokio::test]
    async fn test_delete_team_removes_players() {
        let db = test_db().await;
        let repo = TeamRepositoryImpl::new(db.clone());
        let (team, _) = repo.create_team(new_team("QW")).await.unwrap();
        let (other, _) = repo.create_team(new_team("KS")).await.unwrap();

        repo.delete_team(team.id).await.unwrap();

        assert!(matches!(
            repo.get_team(team.id).await,
            Err(RepoRetrieveError::NotFound)
        ));
        assert_eq!(roster_ids(&db, other.id).await.unwrap().len(), 5);
        assert!(roster_ids(&db, team.id).await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_team(team.id).await,
            Err(RepoUpdateError::NotFound)
        ));
    }
}
