use log::info;
use mongodb::{
    bson::doc,
    options::{FindOptions, InsertManyOptions},
    Database,
};
use rocket::futures::TryStreamExt;

use crate::error::Result;
use crate::model::district::{
    reference_districts, reference_officials, District, DistrictRegistry, Official,
};

use super::Coll;

/// Seed the built-in districts and officials if the database has none.
///
/// This operation is idempotent.
pub async fn ensure_reference_data_exists(db: &Database) -> Result<()> {
    let districts = Coll::<District>::from_db(db);
    if districts.count_documents(None, None).await? == 0 {
        let seed = reference_districts();
        info!("Seeding {} districts", seed.len());
        let ordered = InsertManyOptions::builder().ordered(true).build();
        districts.insert_many(&seed, ordered).await?;
    }

    let officials = Coll::<Official>::from_db(db);
    if officials.count_documents(None, None).await? == 0 {
        let seed = reference_officials();
        info!("Seeding {} officials", seed.len());
        officials.insert_many(&seed, None).await?;
    }

    Ok(())
}

/// Load the reference data into a [`DistrictRegistry`].
///
/// Districts keep their insertion order, which decides which district wins
/// a prefix claimed twice. With `strict`, any such overlap is an error.
pub async fn load_registry(db: &Database, strict: bool) -> Result<DistrictRegistry> {
    // ObjectIds are increasing, so this is insertion order.
    let by_insertion = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let districts: Vec<District> = Coll::<District>::from_db(db)
        .find(None, by_insertion.clone())
        .await?
        .try_collect()
        .await?;
    let officials: Vec<Official> = Coll::<Official>::from_db(db)
        .find(None, by_insertion)
        .await?
        .try_collect()
        .await?;

    let registry = DistrictRegistry::new(districts, officials)?;
    if strict {
        Ok(registry.strict()?)
    } else {
        Ok(registry)
    }
}
